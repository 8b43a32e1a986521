use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "marquee-server", about = "Marquee event conversation server")]
pub struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/marquee.toml")]
    pub config: String,
}
