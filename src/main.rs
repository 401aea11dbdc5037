use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payreq::application::gateway::GatewayRegistry;
use payreq::application::service::PaymentRequestService;
use payreq::config::AppConfig;
use payreq::domain::ports::PaymentRequestStoreRef;
use payreq::infrastructure::gateways::{MockBehavior, MockGateway};
use payreq::infrastructure::in_memory::{
    InMemoryOrderRepository, InMemoryPaymentMethodRegistry, InMemoryPaymentRequestStore,
};
use payreq::interfaces::api::ShopApi;
use payreq::interfaces::csv::catalog_reader::{OrderReader, PaymentMethodReader};
use payreq::interfaces::csv::script_reader::ScriptReader;
use payreq::interfaces::replay::replay;
use std::collections::BTreeSet;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Replay script CSV (`op,target,body`)
    script: PathBuf,

    /// Payment method catalog CSV
    #[arg(long)]
    methods: PathBuf,

    /// Orders CSV, one row per payment
    #[arg(long)]
    orders: PathBuf,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Channel code handed to handler resolution
    #[arg(long)]
    channel: Option<String>,

    /// Locale code handed to handler resolution
    #[arg(long)]
    locale: Option<String>,

    /// How the sandbox gateways answer
    #[arg(long, value_enum, default_value_t = MockBehavior::AlwaysSuccess)]
    gateway_behavior: MockBehavior,
}

fn open_store(config: &AppConfig) -> Result<PaymentRequestStoreRef> {
    match &config.db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(db_path) => {
            let store = payreq::infrastructure::rocksdb::RocksDBStore::open(db_path).into_diagnostic()?;
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            eprintln!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(Arc::new(InMemoryPaymentRequestStore::new()))
        }
        None => Ok(Arc::new(InMemoryPaymentRequestStore::new())),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env().with_overrides(cli.channel, cli.locale, cli.db_path);

    let methods = InMemoryPaymentMethodRegistry::new();
    let mut gateway_names = BTreeSet::new();
    let file = File::open(&cli.methods).into_diagnostic()?;
    for method in PaymentMethodReader::new(file).payment_methods() {
        let method = method.into_diagnostic()?;
        if !method.gateway.is_offline() {
            gateway_names.insert(method.gateway.gateway_name.clone());
        }
        methods.add(method).await;
    }

    let orders = InMemoryOrderRepository::new();
    let file = File::open(&cli.orders).into_diagnostic()?;
    for order in OrderReader::new(file).orders().into_diagnostic()? {
        orders.add(order).await;
    }

    let mut gateways = GatewayRegistry::new();
    for name in gateway_names {
        gateways.register(Arc::new(MockGateway::new(name, cli.gateway_behavior)));
    }

    let service = PaymentRequestService::new(
        open_store(&config)?,
        Arc::new(orders),
        Arc::new(methods),
        gateways,
        &config,
    );
    let api = ShopApi::new(service);

    let file = File::open(&cli.script).into_diagnostic()?;
    let stdout = io::stdout();
    replay(&api, ScriptReader::new(file), stdout.lock())
        .await
        .into_diagnostic()?;

    Ok(())
}
