fn main() {
    lib::invoke::invoke_command_main(patch_and_check::command_main)
}
