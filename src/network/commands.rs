//! Line commands and their dispatch.
//!
//! Lines starting with `/` are commands; anything else is chat text for the
//! partner. Admin commands from non-admins are dropped without a reply.

use super::hub::Hub;
use super::notice::Notice;
use crate::engine::StopOutcome;
use crate::error::{EngineError, Rejection};
use crate::matching::SearchOutcome;
use crate::relay::{Content, RelayOutcome};
use crate::state::UserId;
use tracing::{debug, info};

const DEFAULT_BAN_REASON: &str = "Banned by admin";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(Option<String>),
    Stop,
    Next,
    Report,
    ShowId,
    Appeal,
    SetGender(String),
    SetInterest(Vec<String>),
    Lang(String),
    Stats,
    Send(Content),

    GrantPremium { user: UserId, days: u64 },
    GiftPremium { count: usize, days: u64 },
    Ban { user: UserId, reason: String },
    Unban(UserId),
    ListBanned,
    AdminStats,
    Broadcast(String),
}

/// Why a line did not parse into a [`Command`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    Usage {
        usage: &'static str,
        admin_only: bool,
    },
    Unknown,
}

fn usage(usage: &'static str) -> ParseError {
    ParseError::Usage {
        usage,
        admin_only: false,
    }
}

fn admin_usage(usage: &'static str) -> ParseError {
    ParseError::Usage {
        usage,
        admin_only: true,
    }
}

/// Split off the first whitespace-delimited token.
fn first_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (s, ""),
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        if !line.starts_with('/') {
            return Ok(Self::Send(Content::Text(line.to_string())));
        }

        let (name, rest) = first_token(line);
        let args: Vec<&str> = rest.split_whitespace().collect();

        let command = match name {
            "/search" => Self::Search(args.first().map(|a| a.to_string())),
            "/stop" => Self::Stop,
            "/next" | "/skip" => Self::Next,
            "/report" => Self::Report,
            "/showid" => Self::ShowId,
            "/appeal" => Self::Appeal,
            "/stats" => Self::Stats,
            "/setgender" => match args.first() {
                Some(arg) => Self::SetGender(arg.to_string()),
                None => return Err(usage("/setgender male|female|skip")),
            },
            "/setinterest" => {
                if args.is_empty() {
                    return Err(usage("/setinterest gaming|movies|music|sports ..."));
                }
                Self::SetInterest(args.iter().map(|a| a.to_string()).collect())
            }
            "/lang" => match args.first() {
                Some(arg) => Self::Lang(arg.to_string()),
                None => return Err(usage("/lang id|en")),
            },
            "/photo" => {
                let (file_id, caption) = first_token(rest);
                if file_id.is_empty() {
                    return Err(usage("/photo <file_id> [caption]"));
                }
                Self::Send(Content::Photo {
                    file_id: file_id.to_string(),
                    caption: non_empty(caption),
                })
            }
            "/voice" => match args.first() {
                Some(file_id) => Self::Send(Content::Voice {
                    file_id: file_id.to_string(),
                }),
                None => return Err(usage("/voice <file_id>")),
            },
            "/sticker" => match args.first() {
                Some(file_id) => Self::Send(Content::Sticker {
                    file_id: file_id.to_string(),
                }),
                None => return Err(usage("/sticker <file_id>")),
            },
            "/document" => {
                let (file_id, rest) = first_token(rest);
                let (file_name, caption) = first_token(rest);
                if file_id.is_empty() || file_name.is_empty() {
                    return Err(usage("/document <file_id> <name> [caption]"));
                }
                Self::Send(Content::Document {
                    file_id: file_id.to_string(),
                    file_name: file_name.to_string(),
                    caption: non_empty(caption),
                })
            }

            "/grant_premium" => match args.as_slice() {
                [user, days] => match (user.parse(), days.parse()) {
                    (Ok(user), Ok(days)) => Self::GrantPremium { user, days },
                    _ => return Err(admin_usage("/grant_premium <user_id> <days>")),
                },
                _ => return Err(admin_usage("/grant_premium <user_id> <days>")),
            },
            "/giftpremium" => match args.as_slice() {
                [count, days] => match (count.parse(), days.parse()) {
                    (Ok(count), Ok(days)) => Self::GiftPremium { count, days },
                    _ => return Err(admin_usage("/giftpremium <user_count> <days>")),
                },
                _ => return Err(admin_usage("/giftpremium <user_count> <days>")),
            },
            "/ban" => {
                let (user, reason) = first_token(rest);
                match user.parse() {
                    Ok(user) => Self::Ban {
                        user,
                        reason: non_empty(reason).unwrap_or_else(|| DEFAULT_BAN_REASON.to_string()),
                    },
                    Err(_) => return Err(admin_usage("/ban <user_id> [reason]")),
                }
            }
            "/unban" => match args.first().map(|a| a.parse()) {
                Some(Ok(user)) => Self::Unban(user),
                _ => return Err(admin_usage("/unban <user_id>")),
            },
            "/list_banned" => Self::ListBanned,
            "/adminstats" => Self::AdminStats,
            "/broadcast" => match non_empty(rest) {
                Some(text) => Self::Broadcast(text),
                None => return Err(admin_usage("/broadcast <message>")),
            },
            _ => return Err(ParseError::Unknown),
        };
        Ok(command)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Search(_) => "search",
            Self::Stop => "stop",
            Self::Next => "next",
            Self::Report => "report",
            Self::ShowId => "showid",
            Self::Appeal => "appeal",
            Self::SetGender(_) => "setgender",
            Self::SetInterest(_) => "setinterest",
            Self::Lang(_) => "lang",
            Self::Stats => "stats",
            Self::Send(_) => "send",
            Self::GrantPremium { .. } => "grant_premium",
            Self::GiftPremium { .. } => "giftpremium",
            Self::Ban { .. } => "ban",
            Self::Unban(_) => "unban",
            Self::ListBanned => "list_banned",
            Self::AdminStats => "adminstats",
            Self::Broadcast(_) => "broadcast",
        }
    }

    pub fn is_admin_only(&self) -> bool {
        matches!(
            self,
            Self::GrantPremium { .. }
                | Self::GiftPremium { .. }
                | Self::Ban { .. }
                | Self::Unban(_)
                | Self::ListBanned
                | Self::AdminStats
                | Self::Broadcast(_)
        )
    }
}

fn failure(e: EngineError) -> Notice {
    match e {
        EngineError::Rejected(rejection) => Notice::Rejected(rejection),
        _ => Notice::InternalError,
    }
}

async fn end_chat(hub: &Hub, user: UserId, ended: Notice) -> Notice {
    match hub.engine.stop(user).await {
        Ok(StopOutcome::ChatEnded { partner }) => {
            hub.notify(partner, Notice::PartnerLeft).await;
            ended
        }
        Ok(StopOutcome::SearchCancelled { .. }) => Notice::SearchCancelled,
        Err(e) => failure(e),
    }
}

/// Run `command` for `user`. Returns the notices for `user` themselves;
/// anything for other users is pushed through the hub.
pub async fn execute(hub: &Hub, user: UserId, command: Command) -> Vec<Notice> {
    if command.is_admin_only() && !hub.is_admin(user) {
        debug!(user = %user, command = command.name(), "Ignoring admin command from non-admin");
        return vec![];
    }

    let engine = &hub.engine;
    let reply = match command {
        Command::Search(filter) => match engine.search(user, filter.as_deref()).await {
            Ok(SearchOutcome::Matched {
                partner,
                common_interests,
                ..
            }) => {
                hub.notify(
                    partner,
                    Notice::Matched {
                        common: common_interests.clone(),
                    },
                )
                .await;
                Notice::Matched {
                    common: common_interests,
                }
            }
            Ok(SearchOutcome::Queued { .. }) => Notice::Searching,
            Err(e) => failure(e),
        },
        Command::Stop => end_chat(hub, user, Notice::ChatEnded).await,
        Command::Next => end_chat(hub, user, Notice::Skipped).await,
        Command::Report => match engine.report(user).await {
            Ok(filed) => {
                if let Some(reason) = filed.outcome.auto_ban {
                    hub.notify_admins(Notice::AutoBanAlert {
                        user: filed.reported,
                        reports: filed.outcome.count,
                        reason,
                    })
                    .await;
                }
                Notice::ReportFiled {
                    auto_banned: filed.outcome.auto_ban.is_some(),
                }
            }
            Err(e) => failure(e),
        },
        Command::ShowId => match engine.show_id(user).await {
            Ok(partner) => {
                hub.notify(partner, Notice::PartnerIdentity { user }).await;
                Notice::IdentityShared
            }
            Err(e) => failure(e),
        },
        Command::Appeal => match engine.appeal(user).await {
            Ok(Some(reason)) => {
                hub.notify_admins(Notice::AppealAlert { user, reason }).await;
                Notice::AppealSent
            }
            Ok(None) => Notice::NotBanned,
            Err(e) => failure(e),
        },
        Command::SetGender(arg) => match engine.set_gender(user, &arg).await {
            Ok(gender) => Notice::GenderSet(gender),
            Err(e) => failure(e),
        },
        Command::SetInterest(tokens) => {
            let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
            match engine.set_interests(user, &tokens).await {
                Ok(interests) => Notice::InterestsSet(interests),
                Err(e) => failure(e),
            }
        }
        Command::Lang(arg) => match engine.set_language(user, &arg).await {
            Ok(_) => Notice::LanguageSet,
            Err(e) => failure(e),
        },
        Command::Stats => match engine.user_stats(user).await {
            Ok(stats) => Notice::Stats(stats),
            Err(e) => failure(e),
        },
        Command::Send(content) => match engine.forward(&*hub.clients, user, content).await {
            Ok(RelayOutcome::Delivered { .. }) | Ok(RelayOutcome::NoPartner) => return vec![],
            Ok(RelayOutcome::PartnerUnreachable { .. }) => Notice::PartnerUnreachable,
            Err(e) => failure(e),
        },

        Command::GrantPremium { user: target, days } => {
            match engine.admin().grant_premium(target, days).await {
                Ok(()) => {
                    hub.notify(target, Notice::PremiumGranted { days }).await;
                    Notice::AdminPremiumGranted { user: target, days }
                }
                Err(e) => failure(e),
            }
        }
        Command::GiftPremium { count, days } => {
            match engine.admin().gift_premium(count, days).await {
                Ok(gifted) if gifted.is_empty() => Notice::NoFreeUsers,
                Ok(gifted) => {
                    let mut reached = 0;
                    for &target in &gifted {
                        if hub.notify(target, Notice::PremiumGifted { days }).await {
                            reached += 1;
                        }
                    }
                    info!(admin = %user, gifted = gifted.len(), reached, "Admin gifted premium");
                    Notice::AdminGifted {
                        gifted: gifted.len(),
                        requested: count,
                        days,
                    }
                }
                Err(e) => failure(e),
            }
        }
        Command::Ban {
            user: target,
            reason,
        } => match engine.admin().ban(target, &reason).await {
            Ok(partner) => {
                if let Some(partner) = partner {
                    hub.notify(partner, Notice::PartnerLeft).await;
                }
                hub.notify(target, Notice::Rejected(Rejection::Blocked)).await;
                info!(admin = %user, user = %target, reason = %reason, "Admin ban");
                Notice::AdminBanned { user: target }
            }
            Err(e) => failure(e),
        },
        Command::Unban(target) => match engine.admin().unban(target).await {
            Ok(true) => {
                hub.notify(target, Notice::Unbanned).await;
                Notice::AdminUnbanned { user: target }
            }
            Ok(false) => Notice::AdminNotBanned { user: target },
            Err(e) => failure(e),
        },
        Command::ListBanned => match engine.admin().list_banned().await {
            Ok(page) if page.shown.is_empty() => Notice::NoBannedUsers,
            Ok(page) => Notice::BannedList(page),
            Err(e) => failure(e),
        },
        Command::AdminStats => match engine.admin().global_stats().await {
            Ok(stats) => Notice::GlobalStats(stats),
            Err(e) => failure(e),
        },
        Command::Broadcast(text) => match engine.admin().broadcast_audience().await {
            Ok(audience) => {
                let mut reached = 0;
                for target in audience {
                    if hub.notify(target, Notice::Announcement(text.clone())).await {
                        reached += 1;
                    }
                }
                info!(admin = %user, reached, "Broadcast sent");
                Notice::BroadcastSent { reached }
            }
            Err(e) => failure(e),
        },
    };
    vec![reply]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lines_are_chat_text() {
        assert_eq!(
            Command::parse("hello there"),
            Ok(Command::Send(Content::Text("hello there".into())))
        );
    }

    #[test]
    fn media_commands_split_id_name_and_caption() {
        assert_eq!(
            Command::parse("/document abc report.pdf  the numbers"),
            Ok(Command::Send(Content::Document {
                file_id: "abc".into(),
                file_name: "report.pdf".into(),
                caption: Some("the numbers".into()),
            }))
        );
        assert_eq!(
            Command::parse("/photo p1"),
            Ok(Command::Send(Content::Photo {
                file_id: "p1".into(),
                caption: None,
            }))
        );
        assert_eq!(
            Command::parse("/document abc"),
            Err(usage("/document <file_id> <name> [caption]"))
        );
    }

    #[test]
    fn admin_commands_parse_numbers() {
        assert_eq!(
            Command::parse("/grant_premium 42 30"),
            Ok(Command::GrantPremium {
                user: UserId(42),
                days: 30,
            })
        );
        assert_eq!(
            Command::parse("/grant_premium 42 soon"),
            Err(admin_usage("/grant_premium <user_id> <days>"))
        );
        assert_eq!(
            Command::parse("/ban 7"),
            Ok(Command::Ban {
                user: UserId(7),
                reason: DEFAULT_BAN_REASON.into(),
            })
        );
        assert!(Command::parse("/broadcast hi all").unwrap().is_admin_only());
    }

    #[test]
    fn search_filter_and_unknown_commands() {
        assert_eq!(
            Command::parse("/search female"),
            Ok(Command::Search(Some("female".into())))
        );
        assert_eq!(Command::parse("/search"), Ok(Command::Search(None)));
        assert_eq!(Command::parse("/start"), Err(ParseError::Unknown));
    }
}
