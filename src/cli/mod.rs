//! CLI helpers - config scaffolding and server status probe

use crate::config::ConfigManager;

/// Write the default configuration as TOML
pub async fn run_init(output: String) -> Result<(), Box<dyn std::error::Error>> {
    println!("Initializing configuration file at {}...", output);

    let content = ConfigManager::new().export_toml().await?;
    let content = format!("# patientdb configuration\n{}", content);
    tokio::fs::write(&output, content).await?;

    println!("Configuration file created successfully.");
    Ok(())
}

pub async fn run_status(host: String) -> Result<(), Box<dyn std::error::Error>> {
    let base_url = if host.starts_with("http") { host.clone() } else { format!("http://{}", host) };
    println!("Checking status of {}...", base_url);

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(2))
        .build()?;

    match client.get(format!("{}/health", base_url)).send().await {
        Ok(res) => {
            if res.status().is_success() {
                println!("SUCCESS: Server is UP and responding.");
                println!("Status: {}", res.status());
            } else {
                println!("WARNING: Server responded with error status: {}", res.status());
            }
        }
        Err(e) => {
            println!("ERROR: Could not connect to server: {}", e);
            println!("Is the server running?");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_writes_loadable_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("patientdb.toml");
        let path = path.to_str().unwrap().to_string();

        run_init(path.clone()).await.unwrap();

        let mut manager = ConfigManager::new();
        manager.load(&path).await.unwrap();
        assert_eq!(manager.get().await, ConfigManager::new().get().await);
    }
}
