use reqwest::Client;
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let client = Client::new();
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://127.0.0.1:3000".to_string());

    println!("Greeting:");
    let hi_response = client.get(format!("{}/hi", base_url)).send().await?;
    println!("Status: {}", hi_response.status());
    let hi_json: serde_json::Value = hi_response.json().await?;
    println!("Response: {}", serde_json::to_string_pretty(&hi_json)?);

    println!("\nRag data:");
    let data_response = client
        .get(format!("{}/get-rag-data", base_url))
        .query(&[("file_name", "07461252_Redacted (1).pdf")])
        .send()
        .await?;
    let data_json: serde_json::Value = data_response.json().await?;
    println!("Response: {}", serde_json::to_string_pretty(&data_json)?);

    println!("\nRelevant text:");
    let payload = json!({
        "text": "The policy covers knee surgery after a waiting period of two years.\n\n\
                 Premiums are payable monthly and may be revised on renewal.\n\n\
                 Claims must be filed within thirty days of discharge.",
        "query": "Is knee surgery covered?"
    });
    let relevant_response = client
        .post(format!("{}/relevant-text", base_url))
        .json(&payload)
        .send()
        .await?;
    println!("Status: {}", relevant_response.status());
    let relevant_json: serde_json::Value = relevant_response.json().await?;
    println!("{}", relevant_json["text"].as_str().unwrap_or_default());

    Ok(())
}
