//! Loopback demo.
//!
//! Wires the client stack to an in-memory holder group:
//! - registers a PMID with the maid manager, which validates the signature chain
//! - fetches a chunk some holders have, one nobody has, and one held corrupted
//!
//! Run:
//!   cargo run -p nfs-demo-loopback -- --config nfs.toml --timeout-ms 500

mod network;

use clap::Parser;
use network::{Delivery, LoopbackNetwork};
use nfs_client::{ClientConfig, ClientMaidPostPolicy, DataGetter};
use nfs_core::passport::{Maid, Pmid};
use nfs_core::{Data, Fob, Identity, ImmutableData, NodeId, PmidRegistration, SingleId};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};
use tracing_subscriber::EnvFilter;

/// Replicated reads against an in-memory holder group
#[derive(Parser, Debug)]
#[command(name = "nfs-loopback")]
struct Args {
    /// Client config file (TOML)
    #[arg(short, long, env = "NFS_CONFIG")]
    config: Option<PathBuf>,

    /// Per-get deadline in milliseconds
    #[arg(long, default_value = "2000")]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("nfs_loopback=info".parse()?))
        .init();

    let config = match &args.config {
        Some(path) => ClientConfig::load(path)?,
        None => ClientConfig::default(),
    };
    tracing::info!(
        group_size = config.group_size,
        expected_responses = config.expected_response_count(),
        "starting loopback network"
    );

    let client_id = NodeId::from(Identity::hash_of(b"loopback-client"));
    let (inbox, mut deliveries) = mpsc::unbounded_channel::<Delivery>();
    let network = Arc::new(LoopbackNetwork::new(client_id, config.group_size, inbox));
    let getter = Arc::new(DataGetter::new(
        Arc::clone(&network),
        config.clone(),
        Handle::current(),
    ));

    let pump = {
        let getter = Arc::clone(&getter);
        tokio::spawn(async move {
            while let Some(delivery) = deliveries.recv().await {
                let outcome = getter.service().handle_serialised(
                    &delivery.bytes,
                    delivery.sender,
                    delivery.group,
                    SingleId(client_id),
                );
                match outcome {
                    Ok(disposition) => tracing::debug!(?disposition, "delivered response"),
                    Err(error) => tracing::warn!(%error, "rejected response"),
                }
            }
        })
    };

    register_pmid(&network).await?;

    let timeout = Some(Duration::from_millis(args.timeout_ms));
    let hit = ImmutableData::new(b"stored on two holders".to_vec());
    network.store(*hit.name().value(), hit.content(), &[0, 2]);
    let miss = ImmutableData::new(b"stored nowhere".to_vec());
    let corrupted = ImmutableData::new(b"stored corrupted".to_vec());
    let holders: Vec<usize> = (0..config.group_size).collect();
    network.store(*corrupted.name().value(), b"stored c0rrupted", &holders);

    for (label, chunk) in [("hit", &hit), ("miss", &miss), ("corrupted", &corrupted)] {
        match getter.get(chunk.name(), timeout).await? {
            Ok(data) => tracing::info!(
                label,
                content = %String::from_utf8_lossy(data.content()),
                "get succeeded"
            ),
            Err(error) => tracing::info!(label, %error, "get failed"),
        }
    }

    drop(getter);
    pump.abort();
    Ok(())
}

async fn register_pmid(network: &Arc<LoopbackNetwork>) -> anyhow::Result<()> {
    let maid = Fob::<Maid>::generate();
    let pmid = Fob::<Pmid>::generate();
    network.publish_keys(maid.public_fob(), pmid.public_fob());
    let registration = PmidRegistration::new(&maid, &pmid, false)?;

    let (reply_tx, reply_rx) = oneshot::channel();
    let policy = ClientMaidPostPolicy::new(Arc::clone(network), maid);
    policy.register_pmid(
        &registration,
        Some(Box::new(move |reply: Vec<u8>| {
            let _ = reply_tx.send(reply);
        })),
    )?;
    let reply = reply_rx.await?;
    tracing::info!(
        pmid = %registration.pmid_name().value().short(),
        reply = %String::from_utf8_lossy(&reply),
        "pmid registration answered"
    );
    Ok(())
}
