//! Supervisor control for the ComfyUI server.

use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let exit_code = comfypod_cli::run_control().await;
    if exit_code != 0 {
        process::exit(exit_code);
    }
}
