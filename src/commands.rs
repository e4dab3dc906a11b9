//! CLI Command Handlers
//!
//! Implements all CLI commands by calling the appropriate backend services.
//! Each handler takes CLI args, the loaded config and Output, returns ExitCode.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

use crate::api::{ProviderClient, ProviderError};
use crate::cache::LocalCache;
use crate::cli::{
    CommentsCmd, CommentsListCmd, CommentsPostCmd, EpisodeCmd, ExitCode, InfoCmd, Output,
    PageCmd, PlayCmd, PlayerChoice, SearchCmd, ServersCmd, SuggestCmd,
};
use crate::comments::{CommentError, CommentStore, JsonCommentStore};
use crate::config::Config;
use crate::models::{AnimeDetail, AnimeSummary, EpisodeReference, NewComment, Page, UserContext};
use crate::playback::{PlaybackSession, PlaybackState, RequestInterceptor, ServerName};
use crate::stream::{LocalPlayer, PlayerType, SegmentFetcher};

// =============================================================================
// Shared helpers
// =============================================================================

/// Run a provider call through the local cache
async fn cached<T, F, Fut>(config: &Config, key: &str, fetch: F) -> Result<T, ProviderError>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut cache = config.local_cache();
    if let Some(hit) = cache.as_ref().and_then(|c| c.get::<T>(key)) {
        return Ok(hit);
    }

    let value = fetch().await?;
    if let Some(cache) = cache.as_mut() {
        if let Err(e) = cache.put(key, &value) {
            warn!(error = %e, "could not write local cache");
        }
    }
    Ok(value)
}

fn provider(config: &Config) -> ProviderClient {
    ProviderClient::with_base_url(config.provider_url())
}

fn print_or_fail<T: Serialize>(output: &Output, data: T) -> ExitCode {
    match output.print(data) {
        Ok(()) => ExitCode::Success,
        Err(e) => output.error(format!("Failed to serialize: {}", e), ExitCode::Error),
    }
}

fn print_page(output: &Output, mut page: Page<AnimeSummary>, limit: usize) -> ExitCode {
    page.results.truncate(limit);

    if output.json {
        return print_or_fail(output, &page);
    }
    if let Err(e) = output.print_list(&page.results) {
        return output.error(format!("Failed to print: {}", e), ExitCode::Error);
    }
    if page.has_next_page {
        output.info(format!("-- more on page {}", page.current_page + 1));
    }
    ExitCode::Success
}

// =============================================================================
// Catalogue Commands
// =============================================================================

pub async fn search_cmd(cmd: SearchCmd, config: &Config, output: &Output) -> ExitCode {
    let client = provider(config);
    output.info(format!("Searching for: {}", cmd.query));

    let key = LocalCache::key(&["search", &cmd.query, &cmd.page.to_string()]);
    match cached(config, &key, || client.search(&cmd.query, cmd.page)).await {
        Ok(mut page) => {
            if let Some(kind) = &cmd.kind {
                page.results.retain(|r| {
                    r.kind
                        .as_deref()
                        .is_some_and(|k| k.eq_ignore_ascii_case(kind))
                });
            }
            print_page(output, page, cmd.limit)
        }
        Err(ProviderError::InvalidArgument(msg)) => output.error(msg, ExitCode::InvalidArgs),
        Err(e) => output.error(format!("Search failed: {}", e), ExitCode::NetworkError),
    }
}

pub async fn top_cmd(cmd: PageCmd, config: &Config, output: &Output) -> ExitCode {
    let client = provider(config);
    output.info("Fetching top airing...");

    let key = LocalCache::key(&["top-airing", &cmd.page.to_string()]);
    match cached(config, &key, || client.top_airing(cmd.page)).await {
        Ok(page) => print_page(output, page, cmd.limit),
        Err(e) => output.error(format!("Top airing fetch failed: {}", e), ExitCode::NetworkError),
    }
}

pub async fn recent_cmd(cmd: PageCmd, config: &Config, output: &Output) -> ExitCode {
    let client = provider(config);
    output.info("Fetching recent episodes...");

    // Recent releases change quickly; skip the cache
    match client.recent_episodes(cmd.page).await {
        Ok(page) => print_page(output, page, cmd.limit),
        Err(e) => output.error(
            format!("Recent episodes fetch failed: {}", e),
            ExitCode::NetworkError,
        ),
    }
}

pub async fn info_cmd(cmd: InfoCmd, config: &Config, output: &Output) -> ExitCode {
    let anime_id = match crate::cli::validate_id(&cmd.anime_id) {
        Ok(id) => id.to_string(),
        Err(e) => return output.error(e, ExitCode::InvalidArgs),
    };
    let client = provider(config);
    output.info(format!("Getting info for: {}", anime_id));

    let key = LocalCache::key(&["info", &anime_id]);
    match cached(config, &key, || client.info(&anime_id)).await {
        Ok(mut detail) => {
            if cmd.no_filler {
                detail.episodes.retain(|e| !e.is_filler);
            }
            if output.json {
                return print_or_fail(output, &detail);
            }
            println!("{}", detail);
            if !detail.genres.is_empty() {
                println!("{}", detail.genres.join(", "));
            }
            if !detail.description.is_empty() {
                println!("\n{}\n", detail.description);
            }
            for episode in &detail.episodes {
                println!("{}", episode);
            }
            ExitCode::Success
        }
        Err(ProviderError::NotFound) => {
            output.error(format!("Anime '{}' not found", anime_id), ExitCode::InvalidArgs)
        }
        Err(e) => output.error(format!("Info fetch failed: {}", e), ExitCode::NetworkError),
    }
}

pub async fn servers_cmd(_cmd: ServersCmd, config: &Config, output: &Output) -> ExitCode {
    let catalog = config.server_catalog();
    print_or_fail(output, catalog.names())
}

// =============================================================================
// Playback Commands
// =============================================================================

/// Turn CLI selection into an episode reference and validated server
async fn select_episode(
    cmd: &EpisodeCmd,
    config: &Config,
    client: &ProviderClient,
) -> Result<(EpisodeReference, ServerName), (String, ExitCode)> {
    let target = crate::cli::validate_id(&cmd.target)
        .map_err(|e| (e.to_string(), ExitCode::InvalidArgs))?;

    let catalog = config.server_catalog();
    let server = match &cmd.server {
        Some(name) => catalog
            .parse(name)
            .map_err(|e| (e.to_string(), ExitCode::InvalidArgs))?,
        None => config
            .default_server(&catalog)
            .ok_or_else(|| ("No servers configured".to_string(), ExitCode::NotConfigured))?,
    };

    let Some(number) = cmd.episode else {
        return Ok((EpisodeReference::from_episode_id(target), server));
    };

    let key = LocalCache::key(&["info", target]);
    let detail: AnimeDetail = cached(config, &key, || client.info(target))
        .await
        .map_err(|e| (format!("Info fetch failed: {}", e), ExitCode::NetworkError))?;
    let episode = detail.episode_reference(number).ok_or_else(|| {
        (
            format!("'{}' has no episode {}", detail.title, number),
            ExitCode::InvalidArgs,
        )
    })?;
    Ok((episode, server))
}

/// Resolve the selected episode; Ok only when the session is Ready
async fn resolve_episode(
    cmd: &EpisodeCmd,
    config: &Config,
    output: &Output,
) -> Result<PlaybackSession, ExitCode> {
    let client = provider(config);
    let (episode, server) = select_episode(cmd, config, &client)
        .await
        .map_err(|(msg, code)| output.error(msg, code))?;

    output.info(format!("Resolving {} on {}...", episode, server));
    let mut session = PlaybackSession::new(config.language_table(), config.url_proxy());
    session.resolve(&client, &episode, &server).await;

    match session.state() {
        PlaybackState::Ready { .. } => {}
        PlaybackState::NoSources { server, .. } => {
            let others: Vec<String> = config
                .server_catalog()
                .alternatives(server)
                .into_iter()
                .map(|s| s.to_string())
                .collect();
            return Err(output.error(
                format!(
                    "No sources on '{}'. Try another server: {}",
                    server,
                    others.join(", ")
                ),
                ExitCode::NoSources,
            ));
        }
        PlaybackState::TransportError { message, .. } => {
            return Err(output.error(message.clone(), ExitCode::NetworkError));
        }
        PlaybackState::Idle | PlaybackState::Loading { .. } => {
            return Err(output.error("Episode could not be resolved", ExitCode::Error));
        }
    }

    if let Some(quality) = &cmd.quality {
        if let Err(e) = session.select_quality(quality) {
            return Err(output.error(e.to_string(), ExitCode::InvalidArgs));
        }
    }

    Ok(session)
}

pub async fn sources_cmd(cmd: EpisodeCmd, config: &Config, output: &Output) -> ExitCode {
    let session = match resolve_episode(&cmd, config, output).await {
        Ok(session) => session,
        Err(code) => return code,
    };

    if output.json {
        return print_or_fail(output, session.state());
    }

    let Some(playback) = session.playback() else {
        return ExitCode::Error;
    };
    println!("Server:    {}", playback.server);
    println!(
        "Quality:   {} (of {})",
        playback.source.quality_label(),
        playback.available_qualities.join(", ")
    );
    println!("Type:      {}", playback.media_type);
    println!("URL:       {}", playback.source.url);
    if let Some(injector) = session.interceptor() {
        for (name, value) in injector.pairs() {
            println!("Header:    {}: {}", name, value);
        }
    }
    for track in &playback.subtitles {
        let marker = if track.is_default { "*" } else { " " };
        println!(
            "Subtitle: {}{} [{}] {}",
            marker, track.label, track.language, track.url
        );
    }
    ExitCode::Success
}

pub async fn probe_cmd(cmd: EpisodeCmd, config: &Config, output: &Output) -> ExitCode {
    let session = match resolve_episode(&cmd, config, output).await {
        Ok(session) => session,
        Err(code) => return code,
    };
    let Some(playback) = session.playback() else {
        return ExitCode::Error;
    };
    if !playback.source.is_segmented {
        return output.error("Selected source is not a segmented stream", ExitCode::InvalidArgs);
    }

    let interceptor = session
        .interceptor()
        .cloned()
        .map(|i| Arc::new(i) as Arc<dyn RequestInterceptor>);
    let fetcher = SegmentFetcher::new(interceptor);

    output.info(format!("Fetching manifest {}", playback.source.url));
    match fetcher.probe(&playback.source.url).await {
        Ok(summary) => print_or_fail(output, summary),
        Err(e) => output.error(format!("Manifest fetch failed: {}", e), ExitCode::NetworkError),
    }
}

pub async fn play_cmd(cmd: PlayCmd, config: &Config, output: &Output) -> ExitCode {
    let player_type = match cmd.player {
        Some(PlayerChoice::Mpv) => PlayerType::Mpv,
        Some(PlayerChoice::Vlc) => PlayerType::Vlc,
        None => config
            .player
            .as_deref()
            .and_then(PlayerType::from_name)
            .unwrap_or_default(),
    };
    let player = LocalPlayer::new(player_type);
    if !player.is_available().await {
        return output.error(
            format!("{} not found. Install it first.", player_type),
            ExitCode::PlayerFailed,
        );
    }

    let session = match resolve_episode(&cmd.episode, config, output).await {
        Ok(session) => session,
        Err(code) => return code,
    };
    let Some(playback) = session.playback() else {
        return ExitCode::Error;
    };

    output.info(format!(
        "Playing {} ({}) in {}",
        playback.episode,
        playback.source.quality_label(),
        player_type
    ));

    let result = if cmd.detach {
        player.play(playback, session.interceptor()).await.map(|_| ())
    } else {
        player.play_and_wait(playback, session.interceptor()).await
    };

    match result {
        Ok(()) => print_or_fail(output, playback),
        Err(e) => output.error(e.to_string(), ExitCode::PlayerFailed),
    }
}

// =============================================================================
// Community Commands
// =============================================================================

pub async fn suggest_cmd(cmd: SuggestCmd, config: &Config, output: &Output) -> ExitCode {
    let Some(client) = config.suggestion_client() else {
        return output.error(
            "No suggestion endpoint configured (set [suggest] endpoint in config)",
            ExitCode::NotConfigured,
        );
    };

    output.info(format!("Finding anime like: {}", cmd.title));
    match client.suggest(&cmd.title).await {
        Ok(titles) if output.json => print_or_fail(output, titles),
        Ok(titles) => {
            for (i, title) in titles.iter().enumerate() {
                println!("{}. {}", i + 1, title);
            }
            ExitCode::Success
        }
        Err(crate::api::suggest::SuggestionError::EmptyTitle) => {
            output.error("Title is empty", ExitCode::InvalidArgs)
        }
        Err(e) => output.error(format!("Suggestion failed: {}", e), ExitCode::NetworkError),
    }
}

pub async fn comments_cmd(cmd: CommentsCmd, config: &Config, output: &Output) -> ExitCode {
    let Some(path) = JsonCommentStore::default_path() else {
        return output.error("Could not determine data directory", ExitCode::Error);
    };
    let store = match JsonCommentStore::open(&path).await {
        Ok(store) => store,
        Err(e) => return output.error(e.to_string(), ExitCode::Error),
    };

    match cmd {
        CommentsCmd::List(list) => comments_list(list, &store, output).await,
        CommentsCmd::Post(post) => comments_post(post, config, &store, output).await,
    }
}

async fn comments_list(
    cmd: CommentsListCmd,
    store: &dyn CommentStore,
    output: &Output,
) -> ExitCode {
    let result = match &cmd.replies_to {
        Some(parent) => store.replies(parent).await,
        None => store.top_level(&cmd.episode_id).await,
    };

    match result {
        Ok(mut comments) => {
            if output.json {
                return print_or_fail(output, comments);
            }
            if cmd.show_spoilers {
                for c in &mut comments {
                    c.is_spoiler = false;
                }
            }
            for c in &comments {
                println!("[{}] {}", c.id, c);
            }
            ExitCode::Success
        }
        Err(e) => output.error(e.to_string(), ExitCode::Error),
    }
}

async fn comments_post(
    cmd: CommentsPostCmd,
    config: &Config,
    store: &dyn CommentStore,
    output: &Output,
) -> ExitCode {
    let ctx = match (&cmd.user_id, config.user_context()) {
        (Some(id), _) => {
            let name = cmd.user_name.clone().unwrap_or_else(|| id.clone());
            UserContext::new(id.clone(), name)
        }
        (None, Some(ctx)) => ctx,
        (None, None) => {
            return output.error(
                "No identity: pass --user-id or set [identity] in config",
                ExitCode::InvalidArgs,
            )
        }
    };

    let comment = match &cmd.reply_to {
        Some(parent) => NewComment::reply(&cmd.episode_id, parent, &cmd.text),
        None => NewComment::top_level(&cmd.episode_id, &cmd.text),
    }
    .spoiler(cmd.spoiler);

    match store.post(&ctx, comment).await {
        Ok(id) => print_or_fail(output, serde_json::json!({ "id": id })),
        Err(e @ (CommentError::Io(_) | CommentError::Serialization(_))) => {
            output.error(e.to_string(), ExitCode::Error)
        }
        Err(e) => output.error(e.to_string(), ExitCode::InvalidArgs),
    }
}
