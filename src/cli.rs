use clap::Parser;

use ytmcp::config::Config;

#[derive(Parser)]
#[command(
    name = "ytmcp",
    about = "MCP server that fetches YouTube transcripts",
    version
)]
pub struct Cli {
    /// Username for the Webshare rotating proxy
    #[arg(long, env = "WEBSHARE_PROXY_USERNAME")]
    pub webshare_proxy_username: Option<String>,

    /// Password for the Webshare rotating proxy
    #[arg(long, env = "WEBSHARE_PROXY_PASSWORD", hide_env_values = true)]
    pub webshare_proxy_password: Option<String>,

    /// Proxy URL for HTTP requests
    #[arg(long, env = "HTTP_PROXY")]
    pub http_proxy: Option<String>,

    /// Proxy URL for HTTPS requests
    #[arg(long, env = "HTTPS_PROXY")]
    pub https_proxy: Option<String>,
}

impl Cli {
    /// Proxy settings given on the command line or through the environment
    pub fn settings(&self) -> Config {
        Config {
            webshare_proxy_username: self.webshare_proxy_username.clone(),
            webshare_proxy_password: self.webshare_proxy_password.clone(),
            http_proxy: self.http_proxy.clone(),
            https_proxy: self.https_proxy.clone(),
        }
    }
}
