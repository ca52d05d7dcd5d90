//! Resolve one share link from the command line.
//!
//! ```text
//! cargo run --example resolve_share -- https://pan.lanzouo.com/iAbc123 [password]
//! ```

use std::env;
use std::process::ExitCode;

use lanzou_rs::LanzouClient;

#[tokio::main]
async fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    let Some(share_url) = args.next() else {
        eprintln!("usage: resolve_share <share-url> [password]");
        return ExitCode::from(2);
    };
    let password = args.next().unwrap_or_default();

    let client = match LanzouClient::new() {
        Ok(client) => client,
        Err(err) => {
            eprintln!("failed to build client: {err}");
            return ExitCode::FAILURE;
        }
    };

    let result = client.resolve(&share_url, &password).await;
    println!("status: {}", result.status());
    if let Some(meta) = result.metadata() {
        println!("name:   {}", meta.name);
        println!("size:   {}", meta.size);
        println!("time:   {}", meta.upload_time);
    }

    match result.direct_url() {
        Some(url) => {
            println!("url:    {url}");
            ExitCode::SUCCESS
        }
        None => ExitCode::FAILURE,
    }
}
