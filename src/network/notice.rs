//! Gateway notices, rendered in the recipient's language.
//!
//! Every notice is a single `NOTICE ...` line; multi-part texts are joined
//! with ` | ` so they survive line framing.

use crate::admin::{BannedPage, GlobalStats};
use crate::error::Rejection;
use crate::state::{Gender, Interest, Language, UserId, UserStats};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Welcome,
    Searching,
    Matched { common: Vec<Interest> },
    SearchCancelled,
    ChatEnded,
    Skipped,
    PartnerLeft,
    PartnerUnreachable,
    NotInChat,
    UnknownCommand,
    LineTooLong,
    Rejected(Rejection),
    InternalError,
    Usage(&'static str),

    ReportFiled { auto_banned: bool },
    AppealSent,
    NotBanned,
    IdentityShared,
    PartnerIdentity { user: UserId },
    GenderSet(Option<Gender>),
    InterestsSet(Vec<Interest>),
    LanguageSet,
    Stats(UserStats),

    PremiumGranted { days: u64 },
    PremiumGifted { days: u64 },
    Unbanned,
    Announcement(String),

    AutoBanAlert { user: UserId, reports: usize, reason: &'static str },
    AppealAlert { user: UserId, reason: String },
    AdminPremiumGranted { user: UserId, days: u64 },
    AdminGifted { gifted: usize, requested: usize, days: u64 },
    NoFreeUsers,
    AdminBanned { user: UserId },
    AdminUnbanned { user: UserId },
    AdminNotBanned { user: UserId },
    BannedList(BannedPage),
    NoBannedUsers,
    GlobalStats(GlobalStats),
    BroadcastSent { reached: usize },
}

fn join<T: std::fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Notice {
    pub fn render(&self, lang: Language) -> String {
        format!("NOTICE {}", self.text(lang == Language::En))
    }

    fn text(&self, en: bool) -> String {
        let pick = |en_text: &str, id_text: &str| {
            if en { en_text.to_string() } else { id_text.to_string() }
        };

        match self {
            Self::Welcome => pick(
                "Welcome to ShadowChat. Type /search to find a partner.",
                "Selamat datang di ShadowChat. Ketik /search untuk mencari pasangan.",
            ),
            Self::Searching => pick(
                "Searching for a partner... Type /stop to cancel.",
                "Mencari pasangan... Ketik /stop untuk batal.",
            ),
            Self::Matched { common } if common.is_empty() => {
                pick("You are connected!", "Terhubung!")
            }
            Self::Matched { common } => {
                if en {
                    format!("You are connected! | Shared interests: {}", join(common))
                } else {
                    format!("Terhubung! | Minat sama: {}", join(common))
                }
            }
            Self::SearchCancelled => pick("Search cancelled.", "Pencarian dibatalkan."),
            Self::ChatEnded => pick(
                "You ended this chat. Type /search to talk to someone new.",
                "Kamu telah menghentikan obrolan ini. Ketik /search untuk orang baru.",
            ),
            Self::Skipped => pick(
                "You skipped this partner. Type /search again anytime.",
                "Kamu melewati partner ini. Ketik /search lagi kapan saja.",
            ),
            Self::PartnerLeft => pick(
                "Your chat partner has ended the conversation. Type /search to look for a new partner.",
                "Partner kamu baru saja mengakhiri obrolan. Ketik /search untuk mencari pasangan baru.",
            ),
            Self::PartnerUnreachable => pick(
                "Your chat partner is no longer active. Type /search to find a new one.",
                "Pasanganmu tidak aktif. Ketik /search untuk cari yang baru.",
            ),
            Self::NotInChat => pick(
                "You are not currently in a chat.",
                "Kamu tidak sedang dalam obrolan.",
            ),
            Self::UnknownCommand => pick(
                "Unknown command. While in a chat just send normal messages; use /stop or /next to leave.",
                "Perintah tidak dikenal. Saat dalam obrolan kirim pesan biasa; gunakan /stop atau /next untuk keluar.",
            ),
            Self::LineTooLong => pick(
                "Your message is too long and was not sent.",
                "Pesanmu terlalu panjang dan tidak terkirim.",
            ),
            Self::Rejected(rejection) => rejection_text(rejection, en),
            Self::InternalError => pick(
                "Something went wrong. Please try again later.",
                "Terjadi kesalahan. Coba lagi nanti.",
            ),
            Self::Usage(usage) => {
                if en {
                    format!("Usage: {usage}")
                } else {
                    format!("Cara pakai: {usage}")
                }
            }

            Self::ReportFiled { auto_banned: true } => pick(
                "Thank you for your report. That user has been blocked automatically.",
                "Terima kasih atas laporanmu. Pengguna tersebut telah diblokir otomatis.",
            ),
            Self::ReportFiled { auto_banned: false } => pick(
                "Thank you for your report. The admins will review it.",
                "Terima kasih atas laporanmu. Admin akan meninjau.",
            ),
            Self::AppealSent => pick(
                "Your appeal has been sent to the admins. Please wait.",
                "Permohonan terkirim ke admin. Mohon tunggu.",
            ),
            Self::NotBanned => pick("You are not blocked.", "Kamu tidak sedang diblokir."),
            Self::IdentityShared => pick(
                "Your id has been sent to your partner.",
                "ID kamu terkirim ke partner.",
            ),
            Self::PartnerIdentity { user } => {
                if en {
                    format!("Your chat partner shared their id: {user}")
                } else {
                    format!("Partner ingin berbagi ID: {user}")
                }
            }
            Self::GenderSet(Some(gender)) => {
                if en {
                    format!("Gender set to {gender}.")
                } else {
                    format!("Jenis kelamin diatur ke {gender}.")
                }
            }
            Self::GenderSet(None) => pick("Gender cleared.", "Jenis kelamin dihapus."),
            Self::InterestsSet(interests) => {
                if en {
                    format!("Interests saved: {}", join(interests))
                } else {
                    format!("Minat disimpan: {}", join(interests))
                }
            }
            Self::LanguageSet => pick("Language set to English.", "Bahasa diatur ke Indonesia."),
            Self::Stats(stats) => stats_text(stats, en),

            Self::PremiumGranted { days } => {
                if en {
                    format!("Your premium is now active for {days} days! Use /setgender and /setinterest to set up your profile.")
                } else {
                    format!("Premium kamu aktif untuk {days} hari! Gunakan /setgender dan /setinterest untuk mengatur profilmu.")
                }
            }
            Self::PremiumGifted { days } => {
                if en {
                    format!("CONGRATULATIONS! You have received FREE premium for {days} days!")
                } else {
                    format!("SELAMAT! Kamu mendapat premium GRATIS untuk {days} hari!")
                }
            }
            Self::Unbanned => pick(
                "Your account block has been lifted. Welcome back!",
                "Blokir akunmu telah dicabut. Selamat datang kembali!",
            ),
            Self::Announcement(text) => {
                if en {
                    format!("Announcement: {text}")
                } else {
                    format!("Pengumuman: {text}")
                }
            }

            Self::AutoBanAlert {
                user,
                reports,
                reason,
            } => {
                if en {
                    format!("Auto-ban alert: user {user} was banned ({reason}, {reports} reports).")
                } else {
                    format!("Auto-ban: pengguna {user} di-ban otomatis ({reason}, {reports} laporan).")
                }
            }
            Self::AppealAlert { user, reason } => {
                if en {
                    format!("Appeal: user {user} asks for the ban to be lifted (reason: {reason}).")
                } else {
                    format!("Permohonan banding: pengguna {user} meminta pencabutan blokir (alasan: {reason}).")
                }
            }
            Self::AdminPremiumGranted { user, days } => {
                if en {
                    format!("Premium has been granted to {user} for {days} days.")
                } else {
                    format!("Premium diberikan ke {user} untuk {days} hari.")
                }
            }
            Self::AdminGifted {
                gifted,
                requested,
                days,
            } => {
                if en {
                    format!("Premium was given to {gifted}/{requested} users for {days} days.")
                } else {
                    format!("Premium diberikan ke {gifted}/{requested} pengguna untuk {days} hari.")
                }
            }
            Self::NoFreeUsers => pick(
                "There are no active free users in the last 24 hours.",
                "Tidak ada pengguna gratis yang aktif dalam 24 jam terakhir.",
            ),
            Self::AdminBanned { user } => {
                if en {
                    format!("User {user} has been banned.")
                } else {
                    format!("Pengguna {user} telah di-ban.")
                }
            }
            Self::AdminUnbanned { user } => {
                if en {
                    format!("User {user} has been unbanned.")
                } else {
                    format!("Pengguna {user} telah di-unban.")
                }
            }
            Self::AdminNotBanned { user } => {
                if en {
                    format!("User {user} was not banned.")
                } else {
                    format!("Pengguna {user} tidak sedang diblokir.")
                }
            }
            Self::BannedList(page) => {
                let mut text = if en {
                    format!("Blocked users: {}", join(&page.shown))
                } else {
                    format!("Daftar pengguna yang diblokir: {}", join(&page.shown))
                };
                if page.more > 0 {
                    if en {
                        text.push_str(&format!(" ... and {} more", page.more));
                    } else {
                        text.push_str(&format!(" ... dan {} lainnya", page.more));
                    }
                }
                text
            }
            Self::NoBannedUsers => pick(
                "There are no blocked users.",
                "Tidak ada pengguna yang diblokir.",
            ),
            Self::GlobalStats(s) => {
                if en {
                    format!(
                        "Total users: {} | Active sessions: {} | Waiting in queue: {} | Premium users: {} | Blocked users: {}",
                        s.total_users, s.active_sessions, s.queue_waiting, s.total_premium, s.total_banned
                    )
                } else {
                    format!(
                        "Total pengguna: {} | Sesi aktif: {} | Menunggu di antrian: {} | Pengguna premium: {} | Pengguna diblokir: {}",
                        s.total_users, s.active_sessions, s.queue_waiting, s.total_premium, s.total_banned
                    )
                }
            }
            Self::BroadcastSent { reached } => {
                if en {
                    format!("Broadcast sent to {reached} users.")
                } else {
                    format!("Broadcast terkirim ke {reached} pengguna.")
                }
            }
        }
    }
}

fn rejection_text(rejection: &Rejection, en: bool) -> String {
    let pick = |en_text: &str, id_text: &str| {
        if en { en_text.to_string() } else { id_text.to_string() }
    };
    match rejection {
        Rejection::Blocked => pick(
            "Your account is blocked. Use /appeal to request a review.",
            "Akunmu diblokir. Gunakan /appeal untuk mengajukan banding.",
        ),
        Rejection::RateLimited => pick(
            "You are sending messages too fast. Please wait a few seconds.",
            "Kamu mengirim pesan terlalu cepat. Tunggu beberapa detik.",
        ),
        Rejection::AlreadyInChat => pick(
            "You are already in a chat. Type /stop to leave first.",
            "Kamu sudah dalam obrolan. Ketik /stop untuk keluar.",
        ),
        Rejection::AlreadySearching => pick(
            "You are already searching. Type /stop to cancel.",
            "Kamu sedang mencari. Ketik /stop untuk batal.",
        ),
        Rejection::CooldownActive => pick(
            "Please wait a few seconds before searching again.",
            "Tunggu beberapa detik sebelum mencari lagi.",
        ),
        Rejection::PremiumOnly => pick(
            "This feature is only for premium users.",
            "Fitur ini hanya untuk pengguna premium.",
        ),
        Rejection::InvalidGenderFilter(_) => pick(
            "Usage: /search [male|female|any]",
            "Cara pakai: /search [male|female|any]",
        ),
        Rejection::GenderRequired => pick(
            "Set your gender first using /setgender.",
            "Atur jenis kelaminmu dulu dengan /setgender.",
        ),
        Rejection::NotInChat => pick(
            "You are not currently in a chat.",
            "Kamu tidak sedang dalam obrolan.",
        ),
        Rejection::DangerousFile(_) => pick(
            "Dangerous files are not allowed.",
            "File berbahaya tidak diizinkan.",
        ),
        Rejection::InvalidInterest => pick(
            "Pick from: gaming, movies, music, sports.",
            "Pilih dari: gaming, movies, music, sports.",
        ),
        Rejection::TooManyInterests => pick(
            "You can pick at most 3 interests.",
            "Maksimal 3 minat.",
        ),
        Rejection::InvalidLanguage(_) => pick("Usage: /lang id|en", "Cara pakai: /lang id|en"),
        Rejection::InvalidGender(_) => pick(
            "Usage: /setgender male|female|skip",
            "Cara pakai: /setgender male|female|skip",
        ),
    }
}

fn stats_text(stats: &UserStats, en: bool) -> String {
    let status = match (stats.premium_days_left, en) {
        (Some(days), true) => format!("Premium ({days} days remaining)"),
        (Some(days), false) => format!("Premium ({days} hari tersisa)"),
        (None, true) => "Free".to_string(),
        (None, false) => "Gratis".to_string(),
    };
    let unset = if en { "Not set" } else { "Belum diatur" };
    let gender = stats.gender.map_or(unset.to_string(), |g| g.to_string());
    let interests = if stats.interests.is_empty() {
        unset.to_string()
    } else {
        join(&stats.interests)
    };

    if en {
        format!(
            "Status: {status} | Total chats: {} | Gender: {gender} | Interests: {interests} | Trust: {} ({})",
            stats.total_chats, stats.trust_score, stats.trust_level
        )
    } else {
        format!(
            "Status: {status} | Total obrolan: {} | Jenis kelamin: {gender} | Minat: {interests} | Kepercayaan: {} ({})",
            stats.total_chats, stats.trust_score, stats.trust_level
        )
    }
}
