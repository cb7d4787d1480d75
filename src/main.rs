use argh::FromArgs;
use minish::Interpreter;

#[derive(FromArgs)]
/// An interactive command interpreter with environment expansion, file
/// redirection, a single-stage pipe, background launches and a foreground
/// timeout.
struct Options {
    #[argh(option, default = "10")]
    /// seconds a foreground command may run before it is killed.
    timeout: u32,
}

fn main() {
    let options: Options = argh::from_env();
    let mut shell = Interpreter::new(options.timeout);
    if let Err(e) = shell.repl() {
        eprintln!("minish: {e}");
        std::process::exit(1);
    }
}
