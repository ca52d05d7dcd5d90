use std::error::Error;
use std::io::{self, Write};
use std::time::Duration;

use lanzou_rs::{LanzouClient, LanzouCookie, VERSION};
use tokio::runtime::Runtime;

fn prompt(label: &str) -> io::Result<String> {
    print!("{} ", label);
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn parse_u64(input: &str, default: u64) -> u64 {
    input.trim().parse().ok().filter(|value| *value > 0).unwrap_or(default)
}

#[test]
#[ignore = "Requires network access and manual input"]
fn interactive_resolve_and_account() -> Result<(), Box<dyn Error>> {
    println!("lanzou-rs {} interactive smoke test", VERSION);
    println!("Provide inputs when prompted. Press Enter to accept defaults.\n");

    let share_url = prompt("Share URL:")?;
    if share_url.is_empty() {
        println!("No share URL given, nothing to do.");
        return Ok(());
    }
    let password = prompt("Share password (blank for none):")?;
    let timeout = parse_u64(&prompt("Request timeout in seconds [15]:")?, 15);

    let phpsessid = prompt("PHPSESSID cookie (blank to skip account checks):")?;
    let mut builder = LanzouClient::builder().with_request_timeout(Duration::from_secs(timeout));
    if !phpsessid.is_empty() {
        let ylogin = prompt("ylogin cookie:")?;
        let phpdisk_info = prompt("phpdisk_info cookie:")?;
        builder = builder.with_cookies(LanzouCookie::new(phpsessid, ylogin, phpdisk_info));
    }
    let client = builder.build()?;

    let runtime = Runtime::new()?;
    runtime.block_on(async {
        let result = client.resolve(&share_url, &password).await;
        println!("\nStatus: {}", result.status());
        if let Some(meta) = result.metadata() {
            println!("Name: {}", meta.name);
            println!("Size: {}", meta.size);
            println!("Uploaded: {}", meta.upload_time);
            println!("Description: {}", meta.description);
        }
        match result.direct_url() {
            Some(url) => println!("Direct URL: {url}"),
            None => println!("No direct URL"),
        }

        if let Ok(account) = client.account() {
            let folders = account.folders("-1").await?;
            println!("\nRoot folders: {}", folders.len());
            for folder in folders.iter().take(10) {
                println!("  [{}] {}", folder.id, folder.name);
            }
            let files = account.files("-1").await?;
            println!("Root files: {}", files.len());
            for file in files.iter().take(10) {
                println!("  [{}] {} ({}, {})", file.id, file.name, file.size, file.time);
            }
        }
        Ok::<(), Box<dyn Error>>(())
    })?;

    Ok(())
}
