use anyhow::Result;
use codechat::app::App;
use codechat::config::Config;
use codechat::prefs::Preferences;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::load()?;
    config.validate()?;
    let prefs = Preferences::load();

    let mut app = App::new(&config, prefs)?;
    app.run().await?;

    Ok(())
}
