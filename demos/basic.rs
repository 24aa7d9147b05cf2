use shopchat_realtime_rs::{
    ChatClient, ChatClientOptions, EndpointContext, SessionEvent, UserIdentity, UserRole,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let hostname = std::env::var("CHAT_HOST").unwrap_or_else(|_| "localhost".to_string());
    let token = std::env::var("CHAT_TOKEN").unwrap_or_else(|_| "dev-token".to_string());

    let user = UserIdentity {
        id: 42,
        name: "Budi".to_string(),
        email: Some("budi@example.com".to_string()),
        role: UserRole::Buyer,
    };
    let room = user.default_room();

    // Create client
    let client = ChatClient::new(
        EndpointContext::new(false, &hostname, &room, &token),
        ChatClientOptions::new(user),
    )?;
    let mut events = client.subscribe().await;

    // Connect (walks the candidate list, falling back as needed)
    println!("Connecting to room {room}...");
    client.connect().await?;
    println!("Connected!");

    client.send_message("Halo, ada yang bisa dibantu?", None).await?;

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::Message(msg) => {
                    println!("[{}] {}", msg.user_name, msg.message);
                }
                SessionEvent::MessageConfirmed { local_id, message } => {
                    println!("(delivered #{local_id}) {}", message.message);
                }
                SessionEvent::TypingChanged { user_name, is_typing } => {
                    if is_typing {
                        println!("{user_name} is typing...");
                    }
                }
                other => println!("{other:?}"),
            }
        }
    });

    // Keep connection alive
    tokio::signal::ctrl_c().await?;

    println!("Disconnecting...");
    client.disconnect().await?;
    printer.abort();
    println!("Disconnected!");

    Ok(())
}
