//! CivitAI LoRA download and catalogue tool.

use std::process;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let exit_code = comfypod_cli::run_lora_manager().await;
    if exit_code != 0 {
        process::exit(exit_code);
    }
}
