use log::{info, warn};
use mongodb::{
    bson::doc,
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client,
};
use std::sync::Arc;
use std::time::Duration;

pub async fn create_mongo_client(uri: &str, database: &str) -> Result<Arc<Client>, mongodb::error::Error> {
    info!("Connecting to MongoDB database {database}");

    let mut client_options = ClientOptions::parse(uri).await?;

    client_options.app_name = Some("triptrackr-api".to_string());
    client_options.connect_timeout = Some(Duration::from_secs(10));
    client_options.server_selection_timeout = Some(Duration::from_secs(10));
    client_options.max_pool_size = Some(10);
    client_options.min_pool_size = Some(1);

    // Set the server API if using MongoDB 5.0+
    let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
    client_options.server_api = Some(server_api);

    let client = Client::with_options(client_options)?;
    Ok(Arc::new(client))
}

/// Round-trips a ping so an unreachable server is noticed at startup rather
/// than on the first request.
pub async fn ping(client: &Client, database: &str) -> Result<(), mongodb::error::Error> {
    match client.database(database).run_command(doc! { "ping": 1 }).await {
        Ok(_) => {
            info!("MongoDB ping succeeded");
            Ok(())
        }
        Err(e) => {
            warn!("MongoDB ping failed: {e}");
            Err(e)
        }
    }
}
