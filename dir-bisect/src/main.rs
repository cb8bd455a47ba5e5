fn main() {
    lib::invoke::invoke_command_main(dir_bisect::command_main)
}
