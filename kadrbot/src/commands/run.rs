use std::sync::Arc;

use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;
use tracing::{error, info};

use kadr_core::{
    BotConfig, MediaProber, SizeLimit, TelegramFetcher, UsageStore, VideoPipeline, VideoRequest,
    GENERIC_FAILURE,
};

const GREETING: &str = "👋 Привет! Я бот для обработки видео.\n\n\
                        Отправьте мне видео, и я обработаю его для вас!";
const DOWNLOADING: &str = "⏳ Скачиваю видео...";
const ANALYZING: &str = "🔎 Анализирую видео...";
const ACCESS_DENIED: &str = "⛔ У вас нет доступа к этой команде.";

#[derive(BotCommands, Clone)]
#[command(rename_rule = "lowercase")]
enum Command {
    #[command(description = "начать работу с ботом")]
    Start,
    #[command(description = "статистика бота (только для администратора)")]
    Stats,
}

/// Shared collaborators, built once at startup and injected into every
/// handler invocation.
#[derive(Clone)]
struct BotContext {
    pipeline: Arc<VideoPipeline>,
    store: UsageStore,
    admin_id: i64,
}

pub async fn execute(config: BotConfig) -> crate::Result<()> {
    let store = UsageStore::builder()
        .path(&config.storage.database_path)
        .create_if_missing(true)
        .build()?;
    store.initialize()?;

    let limit = SizeLimit::new(config.limits.max_video_size_bytes);
    let fetcher = TelegramFetcher::new(
        &config.telegram.api_root,
        &config.telegram.token,
        limit,
    )?;
    let prober = MediaProber::from_config(&config.media);
    let pipeline = Arc::new(VideoPipeline::new(
        limit,
        fetcher,
        prober,
        store.clone(),
        config.storage.download_dir.clone(),
    ));
    let context = BotContext {
        pipeline,
        store,
        admin_id: config.telegram.admin_id,
    };

    let bot = Bot::new(config.telegram.token.clone());

    info!(db = %config.storage.database_path.display(), "starting bot");
    let handler = Update::filter_message()
        .branch(
            dptree::entry()
                .filter_command::<Command>()
                .endpoint(handle_command),
        )
        .branch(
            dptree::filter(|msg: Message| msg.video().is_some()).endpoint(handle_video),
        );

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![context])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    context: BotContext,
) -> ResponseResult<()> {
    match cmd {
        Command::Start => {
            if let Some(user) = msg.from.as_ref() {
                if let Err(err) = context
                    .store
                    .add_user(user.id.0 as i64, user.username.as_deref())
                {
                    error!(user_id = user.id.0, error = %err, "failed to register user");
                }
            }
            bot.send_message(msg.chat.id, GREETING).await?;
        }
        Command::Stats => {
            let Some(user) = msg.from.as_ref() else {
                return Ok(());
            };
            let reply = stats_reply(&context.store, context.admin_id, user.id.0 as i64);
            bot.send_message(msg.chat.id, reply).await?;
        }
    }
    Ok(())
}

/// Admin-gated stats text. Non-admin callers are denied before the store
/// is touched.
fn stats_reply(store: &UsageStore, admin_id: i64, user_id: i64) -> String {
    if user_id != admin_id {
        return ACCESS_DENIED.to_string();
    }
    match store.stats() {
        Ok(stats) => format!(
            "📊 Статистика бота:\n\n\
             👥 Всего пользователей: {}\n\
             🎬 Обработано видео: {}",
            stats.total_users, stats.total_videos
        ),
        Err(err) => {
            error!(error = %err, "failed to read usage stats");
            GENERIC_FAILURE.to_string()
        }
    }
}

async fn handle_video(bot: Bot, msg: Message, context: BotContext) -> ResponseResult<()> {
    let Some(video) = msg.video() else {
        return Ok(());
    };
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let request = VideoRequest {
        user_id: user.id.0 as i64,
        username: user.username.clone(),
        file_id: video.file.id.clone(),
        declared_size: video.file.size as u64,
        file_name: video.file_name.clone(),
    };

    let progress = bot.send_message(msg.chat.id, DOWNLOADING).await?;

    let outcome = match context.pipeline.download(&request).await {
        Ok(fetched) => {
            // A lost progress edit must not abort the request itself.
            if let Err(err) = bot
                .edit_message_text(msg.chat.id, progress.id, ANALYZING)
                .await
            {
                error!(error = %err, "failed to edit progress message");
            }
            context.pipeline.finish(&request, fetched).await
        }
        Err(err) => Err(err),
    };

    let reply = match outcome {
        Ok(processed) => format!("✅ Видео обработано!\n\n{}", processed.summary),
        Err(err) => {
            error!(user_id = request.user_id, error = %err, "video request failed");
            err.user_message()
        }
    };
    bot.edit_message_text(msg.chat.id, progress.id, reply).await?;
    Ok(())
}
