use crate::{
    config::Config,
    context::Context,
    event::{Event, IncomingMessage, NewMember},
    llm::MistralClient,
};
use serenity::all::{Guild, Member, Message, Ready};
use tokio::sync::Mutex;

/// Discord event handler
pub struct Handler {
    cfg: Config,
    completion: MistralClient,
    /// Serenity runs every callback on its own task.  Holding this while an event is handled
    /// processes events one at a time.
    turn: Mutex<()>,
}

impl<'a> Handler {
    pub fn new(cfg: Config, completion: MistralClient) -> Self {
        Self {
            cfg,
            completion,
            turn: Mutex::new(()),
        }
    }

    fn ctx(&'a self, discord_ctx: &'a serenity::all::Context) -> Context<'a> {
        Context {
            cfg: &self.cfg,
            completion: &self.completion,
            bot_id: discord_ctx.cache.current_user().id,
            transport: &*discord_ctx.http,
        }
    }

    async fn dispatch(&self, discord_ctx: &serenity::all::Context, event: Event) {
        let _turn = self.turn.lock().await;
        event.handle(self.ctx(discord_ctx)).await;
    }
}

#[serenity::async_trait]
impl serenity::all::EventHandler for Handler {
    async fn ready(&self, discord_ctx: serenity::all::Context, ready: Ready) {
        let event = Event::Ready {
            user_name: ready.user.name.clone(),
            guild_count: ready.guilds.len(),
        };
        self.dispatch(&discord_ctx, event).await;
    }

    async fn message(&self, discord_ctx: serenity::all::Context, msg: Message) {
        let event = Event::Message(IncomingMessage::from(&msg));
        self.dispatch(&discord_ctx, event).await;
    }

    async fn guild_create(
        &self,
        discord_ctx: serenity::all::Context,
        guild: Guild,
        is_new: Option<bool>,
    ) {
        // Also fired for every guild the bot is already in when it connects.
        if is_new != Some(true) {
            return;
        }

        let event = Event::GuildJoin {
            guild_name: guild.name.clone(),
        };
        self.dispatch(&discord_ctx, event).await;
    }

    async fn guild_member_addition(&self, discord_ctx: serenity::all::Context, new_member: Member) {
        let event = Event::MemberJoin(NewMember::from(&new_member));
        self.dispatch(&discord_ctx, event).await;
    }
}
