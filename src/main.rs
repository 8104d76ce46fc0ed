use std::process::ExitCode;

fn main() -> ExitCode {
    chunkpipe::frontend::frontend_main()
}
