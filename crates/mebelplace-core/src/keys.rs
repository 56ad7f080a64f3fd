// ── Query key factories ──
//
// One module per key family. `all()` names the whole family and is what
// mutations invalidate; the narrower keys are what reads cache under.

use strum::{AsRefStr, Display, EnumIter, EnumString};

use crate::cache::QueryKey;

/// Top-level key families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, EnumIter, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Family {
    Auth,
    Users,
    Requests,
    Orders,
    Videos,
    Chats,
    Notifications,
}

impl Family {
    pub fn key(self) -> QueryKey {
        QueryKey::new(self.as_ref())
    }
}

pub mod auth {
    use super::{Family, QueryKey};

    pub fn all() -> QueryKey {
        Family::Auth.key()
    }

    /// The logged-in user. Seeded on login and register.
    pub fn current_user() -> QueryKey {
        all().with("currentUser")
    }

    pub fn user_profile(user_id: u64) -> QueryKey {
        all().with("userProfile").with(user_id)
    }
}

pub mod users {
    use super::{Family, QueryKey};

    pub fn all() -> QueryKey {
        Family::Users.key()
    }

    pub fn by_id(id: u64) -> QueryKey {
        all().with(id)
    }

    pub fn blocked() -> QueryKey {
        all().with("blocked")
    }

    pub fn search(query: &str) -> QueryKey {
        all().with("search").with(query)
    }
}

pub mod requests {
    use super::{Family, QueryKey};

    pub fn all() -> QueryKey {
        Family::Requests.key()
    }

    pub fn list(status: Option<&str>) -> QueryKey {
        all().with("list").with(status.unwrap_or("any"))
    }

    pub fn by_id(id: u64) -> QueryKey {
        all().with(id)
    }

    pub fn offers(request_id: u64) -> QueryKey {
        by_id(request_id).with("offers")
    }

    pub fn user_requests(user_id: u64) -> QueryKey {
        all().with("user").with(user_id)
    }
}

pub mod orders {
    use super::{Family, QueryKey};

    pub fn all() -> QueryKey {
        Family::Orders.key()
    }

    pub fn list(status: Option<&str>) -> QueryKey {
        all().with("list").with(status.unwrap_or("any"))
    }

    pub fn by_id(id: u64) -> QueryKey {
        all().with(id)
    }
}

pub mod videos {
    use super::{Family, QueryKey};

    pub fn all() -> QueryKey {
        Family::Videos.key()
    }

    pub fn feed(page: u32) -> QueryKey {
        all().with("feed").with(page)
    }

    pub fn by_id(id: u64) -> QueryKey {
        all().with(id)
    }

    pub fn comments(video_id: u64) -> QueryKey {
        by_id(video_id).with("comments")
    }

    pub fn user_videos(user_id: u64) -> QueryKey {
        all().with("user").with(user_id)
    }
}

pub mod chats {
    use super::{Family, QueryKey};

    pub fn all() -> QueryKey {
        Family::Chats.key()
    }

    pub fn by_id(id: u64) -> QueryKey {
        all().with(id)
    }

    pub fn messages(chat_id: u64) -> QueryKey {
        by_id(chat_id).with("messages")
    }
}

pub mod notifications {
    use super::{Family, QueryKey};

    pub fn all() -> QueryKey {
        Family::Notifications.key()
    }

    pub fn settings() -> QueryKey {
        all().with("settings")
    }

    pub fn unread_count() -> QueryKey {
        all().with("unreadCount")
    }
}
