use shopchat_realtime_rs::{
    ChatApi, ChatClient, ChatClientOptions, EndpointContext, UserIdentity, UserRole,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let hostname = std::env::var("CHAT_HOST").unwrap_or_else(|_| "localhost".to_string());
    let token = std::env::var("CHAT_TOKEN").unwrap_or_else(|_| "dev-token".to_string());

    let staff = UserIdentity {
        id: 7,
        name: "Admin Sari".to_string(),
        email: None,
        role: UserRole::Admin,
    };

    // List the buyer rooms this staff account can answer
    let api = ChatApi::new(format!("http://{hostname}:8000")).with_token(token.clone());
    let directory = api.buyer_rooms(None).await?;
    println!("{} buyer room(s) waiting", directory.rooms.len());

    let client = ChatClient::new(
        EndpointContext::new(false, &hostname, &staff.default_room(), &token),
        ChatClientOptions::new(staff),
    )?;
    let mut events = client.subscribe().await;

    println!("Connecting to {}...", client.room().await);
    client.connect().await?;

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{event:?}");
        }
    });

    // Hop into each buyer conversation in turn; only one session is live
    // at any moment
    for room in directory.rooms.iter().take(3) {
        tokio::time::sleep(tokio::time::Duration::from_secs(2)).await;
        println!("Switching to {}...", room.name);
        client.switch_room(room.name.clone()).await?;
        api.mark_read(&room.name).await?;
        client.send_message("Halo, admin di sini.", None).await?;
    }

    tokio::signal::ctrl_c().await?;
    client.disconnect().await?;
    Ok(())
}
