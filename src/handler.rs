use lambda_runtime::{Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Deserialize)]
pub struct GreetRequest {
    name: String,
    #[serde(default)]
    shout: bool,
}

#[derive(Serialize)]
pub struct GreetResponse {
    message: String, request_id: String, duration_us: u128,
}

// Business logic behind the warmer; never sees warmer pings
pub async fn function_handler(event: LambdaEvent<GreetRequest>) -> Result<GreetResponse, Error> {
    let (request, context) = event.into_parts();
    let name = request.name.trim();
    if name.is_empty() { return Err("name must not be empty".into()); }
    if name.len() > 64 { return Err("name exceeds maximum of 64 characters".into()); }

    let start = Instant::now();
    let greeting = format!("Hello, {name}!");
    let message = if request.shout { greeting.to_uppercase() } else { greeting };

    Ok(GreetResponse {
        message,
        request_id: context.request_id,
        duration_us: start.elapsed().as_micros(),
    })
}
