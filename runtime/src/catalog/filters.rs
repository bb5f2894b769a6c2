// Copyright 2026 Scout Contributors
// SPDX-License-Identifier: Apache-2.0

//! Catalog query filters and their deterministic URL form.
//!
//! The query URL is the cache identity of a page: parameters are emitted
//! in a fixed order so equal filter sets always produce equal keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

use crate::config::PortalEndpoints;

/// Catalog ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Trend,
    MostRecent,
    LastUpdated,
    TotalUniqueSubscribers,
}

impl SortOrder {
    pub const ALL: [SortOrder; 4] = [
        Self::Trend,
        Self::MostRecent,
        Self::LastUpdated,
        Self::TotalUniqueSubscribers,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Trend => "trend",
            Self::MostRecent => "mostrecent",
            Self::LastUpdated => "lastupdated",
            Self::TotalUniqueSubscribers => "totaluniquesubscribers",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Trend => "Popular",
            Self::MostRecent => "Most Recent",
            Self::LastUpdated => "Recently Updated",
            Self::TotalUniqueSubscribers => "Most Subscribed",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|o| o.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|o| o.as_str()).collect();
                format!("unknown sort '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// Value/label pairs for a single-choice filter. An empty value means "any".
pub type OptionTable = &'static [(&'static str, &'static str)];

pub const TIME_WINDOWS: OptionTable = &[
    ("1", "Today"),
    ("7", "This Week"),
    ("30", "This Month"),
    ("90", "3 Months"),
    ("180", "6 Months"),
    ("365", "This Year"),
    ("-1", "All Time"),
];

pub const CATEGORIES: OptionTable = &[
    ("", "All"),
    ("Wallpaper", "Wallpaper"),
    ("Preset", "Preset"),
    ("Asset", "Asset"),
];

pub const TYPES: OptionTable = &[
    ("", "Any"),
    ("Scene", "Scene"),
    ("Video", "Video"),
    ("Application", "Application"),
    ("Web", "Web"),
];

pub const AGE_RATINGS: OptionTable = &[
    ("", "Any"),
    ("Everyone", "Everyone"),
    ("Questionable", "Questionable"),
    ("Mature", "Mature"),
];

pub const RESOLUTIONS: OptionTable = &[
    ("", "Any"),
    ("1920 x 1080", "1080p"),
    ("2560 x 1440", "1440p"),
    ("3840 x 2160", "4K"),
    ("1280 x 720", "720p"),
    ("1366 x 768", "768p"),
    ("Ultrawide 2560 x 1080", "UW 1080p"),
    ("Ultrawide 3440 x 1440", "UW 1440p"),
    ("Portrait 1080 x 1920", "Portrait 1080p"),
    ("Dynamic resolution", "Dynamic"),
    ("Other resolution", "Other"),
];

pub const ASSET_TYPES: OptionTable = &[
    ("", "Any"),
    ("Particle", "Particle"),
    ("Image", "Image"),
    ("Sound", "Sound"),
    ("Model", "Model"),
    ("Text", "Text"),
    ("Sprite", "Sprite"),
    ("Fullscreen", "Fullscreen"),
    ("Composite", "Composite"),
    ("Script", "Script"),
    ("Effect", "Effect"),
];

pub const ASSET_GENRES: OptionTable = &[
    ("", "Any"),
    ("Audio Visualizer", "Audio Visualizer"),
    ("Background", "Background"),
    ("Character", "Character"),
    ("Clock", "Clock"),
    ("Fire", "Fire"),
    ("Interactive", "Interactive"),
    ("Magic", "Magic"),
    ("Post Processing", "Post Processing"),
    ("Smoke", "Smoke"),
    ("Space", "Space"),
];

pub const MISC_TAGS: &[&str] = &[
    "Approved",
    "Audio responsive",
    "3D",
    "Customizable",
    "Puppet Warp",
    "HDR",
    "Media Integration",
    "User Shortcut",
    "Video Texture",
    "Asset Pack",
];

pub const GENRE_TAGS: &[&str] = &[
    "Abstract",
    "Animal",
    "Anime",
    "Cartoon",
    "CGI",
    "Cyberpunk",
    "Fantasy",
    "Game",
    "Girls",
    "Guys",
    "Landscape",
    "Medieval",
    "Memes",
    "MMD",
    "Music",
    "Nature",
    "Pixel art",
    "Relaxing",
    "Retro",
    "Sci-Fi",
    "Sports",
    "Technology",
    "Television",
    "Vehicle",
    "Unspecified",
];

/// Look up the label for `value` in a single-choice table.
pub fn option_label(table: OptionTable, value: &str) -> Option<&'static str> {
    table.iter().find(|(v, _)| *v == value).map(|(_, l)| *l)
}

/// A complete catalog query.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CatalogFilters {
    pub search: String,
    pub sort: SortOrder,
    /// Time window in days; only sent with [`SortOrder::Trend`].
    pub days: String,
    pub category: String,
    pub type_tag: String,
    pub age_rating: String,
    pub resolution: String,
    pub asset_type: String,
    pub asset_genre: String,
    pub misc_tags: Vec<String>,
    pub genre_tags: Vec<String>,
    pub required_flags: Vec<String>,
    /// 1-based; values below 1 are treated as 1.
    pub page: u32,
}

impl Default for CatalogFilters {
    fn default() -> Self {
        Self {
            search: String::new(),
            sort: SortOrder::Trend,
            days: "7".to_string(),
            category: String::new(),
            type_tag: String::new(),
            age_rating: String::new(),
            resolution: String::new(),
            asset_type: String::new(),
            asset_genre: String::new(),
            misc_tags: Vec::new(),
            genre_tags: Vec::new(),
            required_flags: Vec::new(),
            page: 1,
        }
    }
}

impl CatalogFilters {
    pub fn effective_page(&self) -> u32 {
        self.page.max(1)
    }

    /// The same query on another page.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    /// Required tags in wire order: single-choice tags, misc, then genre.
    pub fn required_tags(&self) -> Vec<&str> {
        [
            &self.category,
            &self.type_tag,
            &self.age_rating,
            &self.resolution,
            &self.asset_type,
            &self.asset_genre,
        ]
        .into_iter()
        .filter(|t| !t.is_empty())
        .chain(self.misc_tags.iter())
        .chain(self.genre_tags.iter())
        .map(String::as_str)
        .collect()
    }

    /// Fully-qualified catalog URL for this query.
    pub fn query_url(&self, endpoints: &PortalEndpoints) -> String {
        let sort = self.sort.as_str();
        let page = self.effective_page().to_string();

        let mut query = form_urlencoded::Serializer::new(String::new());
        query
            .append_pair("appid", &endpoints.app_id)
            .append_pair("browsesort", sort)
            .append_pair("section", "readytouseitems")
            .append_pair("p", &page)
            .append_pair("childpublishedfileid", "0")
            .append_pair("created_date_range_filter_start", "0")
            .append_pair("created_date_range_filter_end", "0")
            .append_pair("updated_date_range_filter_start", "0")
            .append_pair("updated_date_range_filter_end", "0")
            .append_pair("actualsort", sort);

        if self.sort == SortOrder::Trend && !self.days.is_empty() {
            query.append_pair("days", &self.days);
        }
        if !self.search.is_empty() {
            query.append_pair("searchtext", &self.search);
        }
        for tag in self.required_tags() {
            query.append_pair("requiredtags[]", tag);
        }
        for flag in &self.required_flags {
            query.append_pair("requiredflags[]", flag);
        }

        format!("{}?{}", endpoints.browse_url(), query.finish())
    }

    /// Cache identity of this query.
    pub fn query_key(&self, endpoints: &PortalEndpoints) -> String {
        self.query_url(endpoints)
    }
}
