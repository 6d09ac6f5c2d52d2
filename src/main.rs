mod cli;

use github_rest::Client;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::build_cli();
    let matches = cmd.get_matches();
    let log_level = matches.get_one::<String>("log-level").cloned();
    let version_flag = matches.get_flag("version");

    cli::init_logging(log_level.as_deref());

    if version_flag {
        println!("github-rest {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    if matches.subcommand().is_none() {
        let mut help = cli::build_cli();
        help.print_help()?;
        return Ok(());
    }

    let client = Client::from_env()?;
    match cli::run(&client, &matches).await {
        Ok(Some(out)) => println!("{}", out),
        Ok(None) => {}
        Err(e) => {
            eprintln!("error [{}]: {}", e.code(), e);
            std::process::exit(1);
        }
    }
    Ok(())
}
