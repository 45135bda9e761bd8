//! Run orchestration
//!
//! A run moves through a fixed sequence of steps:
//! - Optionally flush the cache
//! - Settle on an authorization code (argument, cache, or prompt)
//! - Export every associated site's endpoints page by page
//! - Zip the run directory and upload it
//!
//! Failures inside the export loop are caught, logged, and reported; the
//! archive step still runs so whatever was exported is packaged.

use crate::api::{build_http_client, ApiClient, Endpoint, EndpointPager, RetryPolicy, Site};
use crate::archive::{
    site_directory, ArchiveStore, MirrorStatus, ObjectStore, HTML_CONTENT_TYPE,
};
use crate::auth::OAuthSession;
use crate::cache::{self, SharedCache};
use crate::config::Config;
use crate::output::{Console, RunStatistics};
use crate::pipeline::options::{run_timestamp, CodePrompt, RunOptions};
use crate::resolver::{derive_post_url, ShortUrlResolver};
use crate::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Snapshot of the associated-sites response
pub const SITES_FILE: &str = "my_sites.json";

/// Run-wide log of derived post URLs
pub const URLS_FILE: &str = "urls.html";

/// Main backup coordinator structure
pub struct Coordinator {
    config: Config,
    cache: SharedCache,
    api: ApiClient,
    retry: RetryPolicy,
    resolver: ShortUrlResolver,
    remote: Option<Arc<dyn ObjectStore>>,
    options: RunOptions,
    console: Console,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - Validated configuration
    /// * `cache` - Store for the code, the token and cached responses
    /// * `remote` - Remote mirror, or `None` for a local-only run
    /// * `options` - Per-invocation controls
    pub fn new(
        config: Config,
        cache: SharedCache,
        remote: Option<Arc<dyn ObjectStore>>,
        options: RunOptions,
    ) -> Result<Self> {
        let http = build_http_client(&config.fetch.user_agent)?;
        let session = OAuthSession::new(&config.api, http.clone(), cache.clone());
        let api = ApiClient::new(&config, http.clone(), session, cache.clone());
        let retry = RetryPolicy::from_config(&config.fetch);
        let resolver = ShortUrlResolver::new(
            http,
            Duration::from_millis(config.fetch.resolve_delay_ms),
        );

        Ok(Self {
            config,
            cache,
            api,
            retry,
            resolver,
            remote,
            options,
            console: Console::stdio(),
        })
    }

    /// Replaces the stdout/stderr console
    pub fn with_console(mut self, console: Console) -> Self {
        self.console = console;
        self
    }

    /// Runs a complete backup
    ///
    /// # Returns
    ///
    /// * `Ok(RunStatistics)` - The run reached the end, possibly with a
    ///   caught export failure recorded in the statistics
    /// * `Err(BackupError)` - Cache, local filesystem, or zip failure
    pub async fn run(&mut self, prompt: &mut dyn CodePrompt) -> Result<RunStatistics> {
        if self.options.flush_cache {
            info!("Flushing cached code, token and responses");
            self.api.session_mut().forget_credentials()?;
            cache::lock(&self.cache)?.flush()?;
        }

        self.resolve_authorization_code(prompt)?;

        let timestamp = run_timestamp(
            self.options.run_timestamp.as_deref(),
            &self.config.output.timestamp_format,
            chrono::Local::now(),
        )?;
        info!("Starting backup run {}", timestamp);

        let store = ArchiveStore::new(
            &self.config.output.local_root,
            self.remote.clone(),
            timestamp.as_str(),
        );
        store.ensure_run_dir().await?;
        // Appends within this invocation only; a rerun of the same timestamp starts over
        store.reset_file(URLS_FILE).await?;

        let mut stats = RunStatistics::new(timestamp.as_str());

        if let Err(e) = self.export_all(&store, &mut stats).await {
            error!("Backup failed: {:?}", e);
            self.console
                .error("Something went wrong. Check the log for details.");
            stats.export_failure = Some(e.to_string());
        }

        match store.mirror_file(URLS_FILE, HTML_CONTENT_TYPE).await {
            Ok(status) => {
                report_mirror(&mut self.console, URLS_FILE, &status);
                stats.record_mirror(&status);
            }
            Err(e) => warn!("Could not mirror {}: {}", URLS_FILE, e),
        }

        let outcome = store.archive_run(!self.options.skip_upload).await?;
        self.console
            .info(&format!("Archive written to {}", outcome.zip.path.display()));
        stats.archive_path = Some(outcome.zip.path);
        stats.upload = Some(outcome.upload);

        self.console.info("Finished");
        info!("Backup run {} finished", timestamp);
        Ok(stats)
    }

    /// Settles on the code used for the token exchange
    ///
    /// An explicit code wins, then a cached one, then the prompt. An empty
    /// answer leaves the session without a code; the first uncached API
    /// call then fails inside the export loop.
    fn resolve_authorization_code(&mut self, prompt: &mut dyn CodePrompt) -> Result<()> {
        if let Some(code) = self.options.code.as_deref().filter(|c| !c.trim().is_empty()) {
            debug!("Using authorization code from the command line");
            self.api.session_mut().set_authorization_code(code)?;
            return Ok(());
        }

        if self.api.session_mut().resume_cached_code()?.is_some() {
            return Ok(());
        }

        let url = self.api.session().authorization_url()?;
        match prompt.ask(url.as_str()) {
            Ok(answer) if !answer.trim().is_empty() => {
                self.api.session_mut().set_authorization_code(&answer)?;
            }
            Ok(_) => warn!("No authorization code entered"),
            Err(e) => {
                warn!("Could not read an authorization code: {}", e);
                self.console
                    .error(&format!("Could not read an authorization code: {}", e));
            }
        }
        Ok(())
    }

    async fn export_all(&mut self, store: &ArchiveStore, stats: &mut RunStatistics) -> Result<()> {
        let (raw, sites) = self.api.associated_sites().await?;
        let outcome = store.save_json(SITES_FILE, &raw).await?;
        stats.record_save(&outcome);
        report_mirror(&mut self.console, SITES_FILE, &outcome.mirror);
        stats.sites_total = sites.len();
        info!("Found {} associated sites", sites.len());

        for site in &sites {
            self.console.site_row(
                &site.site_name,
                &site_directory(site),
                &site.site_url,
            );
        }

        for site in &sites {
            if self.config.exclude_sites.contains(&site.site_name) {
                info!("Skipping excluded site {}", site.site_name);
                stats.sites_excluded += 1;
                continue;
            }

            self.console.info(&format!("Exporting {}", site.site_name));
            info!("Exporting {} ({})", site.site_name, site.site_url);
            for endpoint in Endpoint::ALL {
                self.export_endpoint(store, site, endpoint, stats).await?;
            }
            stats.sites_exported += 1;
        }

        Ok(())
    }

    async fn export_endpoint(
        &mut self,
        store: &ArchiveStore,
        site: &Site,
        endpoint: Endpoint,
        stats: &mut RunStatistics,
    ) -> Result<()> {
        let directory = site_directory(site);
        let mut pager = EndpointPager::new(&self.api, &self.retry, endpoint, site)?;

        while let Some(page) = pager.next_page().await? {
            let relative = format!("{}/{}/page_{:04}.json", directory, endpoint.name(), page.number);
            let outcome = store.save_json(&relative, &page.body).await?;
            stats.record_save(&outcome);
            report_mirror(&mut self.console, &relative, &outcome.mirror);
            stats.pages_saved += 1;
            stats.items_saved += page.items.len() as u64;
            self.console
                .info(&format!("Saved to {}", outcome.local_path.display()));

            for item in &page.items {
                let Some(url) = derive_post_url(endpoint, site, item) else {
                    continue;
                };

                let resolution = self.resolver.resolve(&url).await;
                if resolution.fell_back {
                    stats.urls_fallen_back += 1;
                    self.console.mark('-');
                } else {
                    stats.urls_resolved += 1;
                    self.console.mark('.');
                }
                store.append_line(URLS_FILE, &resolution.anchor_line()).await?;
            }
            self.console.end_marks();
        }

        debug!(
            "{} on {}: {} pages",
            endpoint,
            site.site_name,
            pager.pages_requested()
        );
        Ok(())
    }
}

/// Puts a failed remote write in front of the user; the log has the cause
fn report_mirror(console: &mut Console, relative: &str, status: &MirrorStatus) {
    if let MirrorStatus::Failed(_) = status {
        console.error(&format!(
            "ERROR: could not copy {} to remote storage. Check the logs.",
            relative
        ));
    }
}
