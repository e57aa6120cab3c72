use std::sync::Arc;

use crate::backfill::Backfiller;
use crate::config::AppConfig;
use crate::error::TrackerResult;
use crate::history::outlier::OutlierFilter;
use crate::history::service::HistoryService;
use crate::ingestion::Ingestor;
use crate::provider::{http_client, AlchemyClient, CoinGeckoClient, PriceProvider, RateProvider};
use crate::rates::RateCache;
use crate::store::SampleStore;

/// Shared application state, passed to handlers via `axum::extract::State`.
pub struct AppState {
    pub config: AppConfig,
    pub store: Arc<dyn SampleStore>,
    pub history: HistoryService,
    pub ingestor: Arc<Ingestor>,
    pub backfiller: Backfiller,
    pub rates: RateCache,
    /// Reused for per-request clients (backfill credentials can come from the query string)
    pub http: reqwest::Client,
}

impl AppState {
    /// Wire the production providers from `config`.
    pub fn new(config: AppConfig, store: Arc<dyn SampleStore>) -> TrackerResult<Arc<Self>> {
        let http = http_client(config.http_timeout_ms)?;
        let price: Arc<dyn PriceProvider> = Arc::new(AlchemyClient::new(
            http.clone(),
            config.alchemy_base_url.clone(),
            config.alchemy_api_key.clone(),
        ));
        let rates: Arc<dyn RateProvider> =
            Arc::new(CoinGeckoClient::new(http.clone(), config.coingecko_base_url.clone()));

        let supply = config.alchemy_api_key.is_some().then(|| price.clone());
        Ok(Self::with_providers(config, store, price, rates, supply, http))
    }

    /// Wire explicit providers. `supply_for_backfill` is optional; without it
    /// backfill uses the fallback supply.
    pub fn with_providers(
        config: AppConfig,
        store: Arc<dyn SampleStore>,
        price: Arc<dyn PriceProvider>,
        rates: Arc<dyn RateProvider>,
        supply_for_backfill: Option<Arc<dyn PriceProvider>>,
        http: reqwest::Client,
    ) -> Arc<Self> {
        let history = HistoryService::new(
            store.clone(),
            OutlierFilter::new(config.outlier.clone()),
            config.windows.clone(),
        )
        .with_current_source(config.current_source)
        .with_range_ms(config.history_range_ms);

        let ingestor = Arc::new(Ingestor::new(
            price,
            store.clone(),
            config.contract.clone(),
            config.retention_days,
        ));

        let mut backfiller = Backfiller::new(
            store.clone(),
            config.contract.clone(),
            config.backfill_fallback_supply,
            config.backfill_poll,
        );
        if let Some(provider) = supply_for_backfill {
            backfiller = backfiller.with_supply_provider(provider);
        }

        let rates = RateCache::new(rates, config.rates_cache_ms);

        Arc::new(Self {
            config,
            store,
            history,
            ingestor,
            backfiller,
            rates,
            http,
        })
    }
}
