use crate::domain::value_objects::Visibility;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Posts API が返す投稿。この層では読み取り専用で、
/// 書き換えはいいね数の楽観更新だけ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub media_url: Option<String>,
    pub user_id: i64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub visibility: Visibility,
    #[serde(default)]
    pub likes_count: u32,
    #[serde(default)]
    pub views_count: u32,
    #[serde(default)]
    pub comments_count: u32,
    #[serde(with = "iso_utc")]
    pub created_at: DateTime<Utc>,
    #[serde(default, with = "iso_utc_opt")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user: Option<String>,
}

impl Post {
    pub fn increment_likes(&mut self) {
        self.likes_count += 1;
    }

    pub fn author_label(&self) -> &str {
        self.user.as_deref().unwrap_or("Unknown")
    }

    /// アバター代わりに使う頭文字。
    pub fn author_initial(&self) -> char {
        self.author_label()
            .chars()
            .next()
            .map(|c| c.to_ascii_uppercase())
            .unwrap_or('U')
    }

    pub fn has_media(&self) -> bool {
        self.media_url.as_deref().is_some_and(|url| !url.is_empty())
    }

    /// 本文から HTML タグを落とした共有用テキスト。
    pub fn plain_text(&self) -> String {
        let mut out = String::with_capacity(self.content.len());
        let mut in_tag = false;
        for ch in self.content.chars() {
            match ch {
                '<' => in_tag = true,
                '>' if in_tag => in_tag = false,
                _ if !in_tag => out.push(ch),
                _ => {}
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopularTag {
    pub tag: String,
    pub count: u64,
}

// バックエンドはタイムゾーン表記なしの ISO 文字列を返すことがあるので、
// RFC3339 とナイーブ表記の両方を UTC として受ける。
mod iso_utc {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(de)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Some(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

mod iso_utc_opt {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        ser: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => ser.serialize_some(&ts.to_rfc3339()),
            None => ser.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        de: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        let raw: Option<String> = Option::deserialize(de)?;
        match raw {
            None => Ok(None),
            Some(raw) => super::iso_utc::parse(&raw)
                .map(Some)
                .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}"))),
        }
    }
}
