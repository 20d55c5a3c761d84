use std::io;

use anyhow::Result;
use kvlang_language_server::config::Config;
use kvlang_language_server::logging;
use kvlang_language_server::lsp::Server;

fn main() -> Result<()> {
    let config = Config::from_args_and_env()?;
    logging::init(&config)?;
    if let Some(path) = &config.config_file {
        log::info!("using configuration from {}", path.display());
    }

    let mut reader = io::stdin().lock();
    let mut writer = io::stdout().lock();
    let code = match Server::new(config).run(&mut reader, &mut writer) {
        Ok(code) => code,
        Err(error) => {
            log::error!("server stopped: {error}");
            1
        }
    };
    std::process::exit(code)
}
