use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::core::error::M3Error;

/// Kinds of content m3 manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Mod,
    ResourcePack,
    TexturePack,
    ShaderPack,
}

/// Static facts about one category.
#[derive(Debug)]
pub struct CategoryInfo {
    /// Key used in `m3.json` paths and the default directory name.
    pub dir_name: &'static str,
    pub label: &'static str,
}

const CATEGORY_TABLE: [CategoryInfo; 4] = [
    CategoryInfo {
        dir_name: "mods",
        label: "Mod",
    },
    CategoryInfo {
        dir_name: "resourcepacks",
        label: "Resource pack",
    },
    CategoryInfo {
        dir_name: "texturepacks",
        label: "Texture pack",
    },
    CategoryInfo {
        dir_name: "shaderpacks",
        label: "Shader pack",
    },
];

impl AssetCategory {
    pub const ALL: [AssetCategory; 4] = [
        AssetCategory::Mod,
        AssetCategory::ResourcePack,
        AssetCategory::TexturePack,
        AssetCategory::ShaderPack,
    ];

    pub fn info(self) -> &'static CategoryInfo {
        &CATEGORY_TABLE[self as usize]
    }

    pub fn dir_name(self) -> &'static str {
        self.info().dir_name
    }

    pub fn label(self) -> &'static str {
        self.info().label
    }

    /// Map a vendor project-type hint (`"mod"`, `"resourcepack"`, `"shader"` ...).
    pub fn from_hint(hint: &str) -> Option<Self> {
        hint.parse().ok()
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetCategory::Mod => write!(f, "mod"),
            AssetCategory::ResourcePack => write!(f, "resourcepack"),
            AssetCategory::TexturePack => write!(f, "texturepack"),
            AssetCategory::ShaderPack => write!(f, "shaderpack"),
        }
    }
}

impl FromStr for AssetCategory {
    type Err = M3Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .to_ascii_lowercase()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect();
        match normalized.as_str() {
            "mod" | "mods" => Ok(AssetCategory::Mod),
            "resourcepack" | "resourcepacks" | "resource" => Ok(AssetCategory::ResourcePack),
            "texturepack" | "texturepacks" | "texture" => Ok(AssetCategory::TexturePack),
            "shaderpack" | "shaderpacks" | "shader" => Ok(AssetCategory::ShaderPack),
            _ => Err(M3Error::UnknownCategory(s.to_string())),
        }
    }
}

/// Where an asset comes from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    CurseForge,
    Modrinth,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::CurseForge => write!(f, "curseforge"),
            Platform::Modrinth => write!(f, "modrinth"),
        }
    }
}

/// Which side an asset is required on. Required on one side implies
/// optional on the other.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Client,
    Server,
    #[default]
    Both,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Client => write!(f, "client"),
            Side::Server => write!(f, "server"),
            Side::Both => write!(f, "both"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lookup_matches_variant() {
        assert_eq!(AssetCategory::Mod.dir_name(), "mods");
        assert_eq!(AssetCategory::ResourcePack.dir_name(), "resourcepacks");
        assert_eq!(AssetCategory::TexturePack.dir_name(), "texturepacks");
        assert_eq!(AssetCategory::ShaderPack.dir_name(), "shaderpacks");
    }

    #[test]
    fn parse_accepts_cli_spellings() {
        assert_eq!("mod".parse::<AssetCategory>().unwrap(), AssetCategory::Mod);
        assert_eq!(
            "resource_pack".parse::<AssetCategory>().unwrap(),
            AssetCategory::ResourcePack
        );
        assert_eq!(
            AssetCategory::from_hint("shader"),
            Some(AssetCategory::ShaderPack)
        );
        assert!("modpack".parse::<AssetCategory>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&AssetCategory::ResourcePack).unwrap();
        assert_eq!(json, "\"resourcepack\"");
        let side: Side = serde_json::from_str("\"client\"").unwrap();
        assert_eq!(side, Side::Client);
    }
}
