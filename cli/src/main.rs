mod args;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use mailpaper::auth::{MailAuthorizer, SyncAuthorizer};
use mailpaper::{
    convert_file, default_output_path, init_logging, resolve_config, Config, Converter,
    GoogleAuthorizer, InboxPoller, LibreOfficeConverter, MailpaperError, OperatorPrompt,
    RemarkableAuthorizer, StdinPrompt,
};
use tracing::info;

use args::{Cli, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: &Cli) -> Result<(), MailpaperError> {
    let config = resolve_config(cli.config.as_deref())?;
    init_logging(&config.log)?;

    info!("Starting mailpaper v{}", env!("CARGO_PKG_VERSION"));

    match cli.action() {
        Command::Convert(input) => {
            let output = default_output_path(&input);
            convert_file(&office_converter(&config), &input, &output).await?;
            println!("{}", output.display());
        }
        Command::Authorize => {
            let prompt: Arc<dyn OperatorPrompt> = Arc::new(StdinPrompt::new());
            GoogleAuthorizer::new(&config, prompt.clone())?
                .authorize()
                .await?;
            RemarkableAuthorizer::new(&config, prompt)?
                .authorize()
                .await?;
            info!("Credentials stored");
        }
        Command::Monitor => monitor(&config).await?,
    }

    Ok(())
}

async fn monitor(config: &Config) -> Result<(), MailpaperError> {
    let prompt: Arc<dyn OperatorPrompt> = Arc::new(StdinPrompt::new());
    let mail_auth = Arc::new(GoogleAuthorizer::new(config, prompt.clone())?);
    let sync_auth = Arc::new(RemarkableAuthorizer::new(config, prompt)?);

    let mut poller = InboxPoller::start(
        mail_auth,
        sync_auth,
        office_converter(config),
        config.poll_interval(),
    )
    .await?;
    poller.run().await;

    Ok(())
}

fn office_converter(config: &Config) -> Converter {
    Converter::new(Arc::new(LibreOfficeConverter::from_config(&config.office)))
}
