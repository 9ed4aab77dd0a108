//! Sona CLI - headless interface to the voice-interactive research
//! assistant core.
//!
//! ```bash
//! sona-cli -e "what are the top 5 companies by market cap"
//! sona-cli --quiet -e "what is 2+2"
//! sona-cli   # interactive REPL
//! ```

use anyhow::Result;
use clap::Parser;

use sona::cli::{execute_batch, execute_once, initialize, run_repl, Args};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    #[cfg(feature = "server")]
    if args.server {
        let mut ctx = initialize(&args).await?;
        return sona::server::serve(ctx.dispatcher, args.port).await;
    }

    let mut ctx = initialize(&args).await?;

    if let Some(ref utterance) = args.execute {
        execute_once(&mut ctx, utterance).await
    } else if let Some(ref file) = args.file {
        execute_batch(&mut ctx, file).await
    } else {
        run_repl(&mut ctx).await
    }
}
