//! Verification example for the tempmail client.
//!
//! Provisions a throwaway inbox, then polls it for up to 2 minutes.
//! Send any email to the printed address to see it picked up.

use std::time::Duration;

use tempmail_client::{Client, PollOptions};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Testing Mail.tm-compatible providers...");
    println!("{}", "-".repeat(50));

    let mut client = Client::new()?;
    let domain = client.valid_domain().await?;
    println!("✅ Provider {} is up, domain: {domain}", client.active_base());

    let email = client
        .create_email(&Client::random_alias("demo"), None)
        .await?;
    println!("✅ Created temporary email: {email}");

    println!("\n⏳ Polling for messages (2 min max)... Send an email to: {email}");
    let opts = PollOptions::default()
        .timeout(Duration::from_secs(120))
        .interval(Duration::from_secs(5));

    if client.wait_for_emails(&email, 1, opts).await? {
        let inbox = client.get_messages(&email).await?;
        println!("\n✅ Message(s) received! Messages in inbox: {}", inbox.total);
        for msg in &inbox.messages {
            println!(
                "   - Subject: {}, Preview: {}",
                msg.subject.as_deref().unwrap_or("<none>"),
                msg.intro.as_deref().unwrap_or("<none>")
            );
        }
        if let Some(first) = inbox.messages.first() {
            let detail = client.fetch_message(&email, &first.id).await?;
            println!("   Full text: {}", detail.text.unwrap_or_default());
        }
    } else {
        println!("\n⚠️  Timeout: No messages received after 2 minutes");
    }

    println!("{}", "-".repeat(50));
    Ok(())
}
