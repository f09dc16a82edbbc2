use std::{error::Error, net::SocketAddr, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use clientele::{
    application::CustomerService,
    domain::customer::CustomerRepository,
    infrastructure::{connect, InMemoryCustomerRepository, SqlCustomerRepository},
    ClienteleConfig, Storage,
};
use clientele_web::create_router;
use tracing::{error, info, Level};

#[tokio::main]
async fn main() {
    match ClienteleConfig::load() {
        Ok(config) => {
            tracing_subscriber::fmt()
                .with_max_level(Level::from(&config.logger.level))
                .init();
            if let Err(error) = serve(&config).await {
                error!("アプリケーションエラー: {}", error);
            }
        }
        Err(error) => {
            tracing_subscriber::fmt::init();
            error!("設定の読み込みに失敗しました: {}", error)
        }
    }
}

async fn serve(config: &ClienteleConfig) -> Result<(), Box<dyn Error>> {
    let repository: Arc<dyn CustomerRepository> = match config.storage {
        Storage::Sql => Arc::new(SqlCustomerRepository::new(
            connect(&config.database).await?,
        )),
        Storage::Memory => {
            info!("デモ用の顧客データでメモリストレージを初期化します");
            Arc::new(InMemoryCustomerRepository::with_demo_customers())
        }
    };
    let app = create_router(CustomerService::new(repository));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let handle = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    info!("待ち受けを開始します: {}", addr);
    match &config.server.tls {
        Some(tls) => {
            let rustls = RustlsConfig::from_pem_file(&tls.cert, &tls.key).await?;
            axum_server::bind_rustls(addr, rustls)
                .handle(handle)
                .serve(app.into_make_service())
                .await?
        }
        None => {
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await?
        }
    }
    Ok(())
}

async fn shutdown_signal(handle: Handle) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("シグナルハンドラの登録に失敗しました: {}", e);
        return;
    }
    info!("シャットダウンします");
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}
