use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use clap::Parser;
use log::{error, info, LevelFilter};
use tokio::net::TcpListener;

use crate::connection::{Connection, StreamRegistry};

mod connection;

#[derive(Parser, Debug)]
#[command(version, about = "Accepts RTMP publishers and relays their media to players")]
struct Args {
    /// Address to listen for RTMP connections on
    #[arg(short, long, default_value = "0.0.0.0:1935")]
    address: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .init();

    let args = Args::parse();
    let registry: StreamRegistry = Arc::new(Mutex::new(HashMap::new()));

    let listener = TcpListener::bind(args.address).await?;
    info!("Listening for connections on {}", args.address);

    let mut current_id = 0;
    loop {
        let (socket, peer) = listener.accept().await?;
        info!("Connection {}: Connection received from {}", current_id, peer.ip());

        let connection = Connection::new(current_id, registry.clone());
        spawn(connection.run(socket));
        current_id += 1;
    }
}

fn spawn<F, E>(future: F)
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display,
{
    tokio::task::spawn(async {
        if let Err(error) = future.await {
            error!("{}", error);
        }
    });
}
