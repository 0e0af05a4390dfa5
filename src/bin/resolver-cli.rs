use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "resolver-cli")]
#[command(about = "Management CLI for the route resolver", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8081")]
    url: String,

    #[arg(short, long, env = "RESOLVER_ADMIN_KEY")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check service status and rule counts
    Status,
    /// List compiled rules in match order
    Rules {
        /// Rule scope: site or cp
        #[arg(short, long, default_value = "site")]
        scope: String,
    },
    /// Generate a URL for a handler
    Url {
        handler: String,
        #[arg(short, long, default_value = "site")]
        scope: String,
        /// Params as key=value, repeatable
        #[arg(short, long = "param", value_parser = parse_pair)]
        params: Vec<(String, String)>,
    },
}

fn parse_pair(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got '{}'", s))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let request = match cli.command {
        Commands::Status => client.get(format!("{}/admin/status", cli.url)),
        Commands::Rules { scope } => client
            .get(format!("{}/admin/rules", cli.url))
            .query(&[("scope", scope)]),
        Commands::Url {
            handler,
            scope,
            params,
        } => {
            let mut query = vec![("handler".to_string(), handler), ("scope".to_string(), scope)];
            query.extend(params);
            client.get(format!("{}/admin/url", cli.url)).query(&query)
        }
    };

    let res = request.headers(headers).send().await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
