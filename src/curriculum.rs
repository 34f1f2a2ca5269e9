use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "gradebook.json";

/// Characters reserved by the flat-file encoding.
const RESERVED: [char; 6] = [':', '|', ';', ',', '\n', '\r'];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearModules {
    pub year: String,
    pub modules: Vec<String>,
}

/// The fixed, ordered set of academic years and the modules each one requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Curriculum {
    pub years: Vec<YearModules>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ConfigFile {
    curriculum: Vec<YearModules>,
}

impl Default for Curriculum {
    fn default() -> Self {
        let year = |label: &str, modules: [&str; 4]| YearModules {
            year: label.to_string(),
            modules: modules.iter().map(|m| m.to_string()).collect(),
        };
        Self {
            years: vec![
                year(
                    "Year 1",
                    [
                        "Problem Solving and Programming",
                        "Operating System",
                        "Information Security",
                        "Networking",
                    ],
                ),
                year(
                    "Year 2",
                    [
                        "Computer Hardware",
                        "Human-Computer Interaction and Web Development",
                        "Algorithms and Data Structure",
                        "Communications",
                    ],
                ),
                year(
                    "Year 3",
                    [
                        "Big Data",
                        "Internet of Things",
                        "Contemporary Issues in Computing",
                        "Project",
                    ],
                ),
            ],
        }
    }
}

impl Curriculum {
    pub fn new(years: Vec<YearModules>) -> anyhow::Result<Self> {
        let c = Self { years };
        c.validate()?;
        Ok(c)
    }

    pub fn modules_for(&self, year: &str) -> Option<&[String]> {
        self.years
            .iter()
            .find(|y| y.year == year)
            .map(|y| y.modules.as_slice())
    }

    pub fn contains(&self, year: &str) -> bool {
        self.modules_for(year).is_some()
    }

    pub fn year_labels(&self) -> Vec<&str> {
        self.years.iter().map(|y| y.year.as_str()).collect()
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.years.is_empty() {
            return Err(anyhow!("curriculum must define at least one year"));
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for y in &self.years {
            check_label("year label", &y.year)?;
            if !seen.insert(y.year.as_str()) {
                return Err(anyhow!("duplicate year label: {}", y.year));
            }
            if y.modules.is_empty() {
                return Err(anyhow!("{} has no modules", y.year));
            }
            for m in &y.modules {
                check_label("module name", m)
                    .with_context(|| format!("invalid module in {}", y.year))?;
            }
        }
        Ok(())
    }

    pub fn config_path(workspace: &Path) -> PathBuf {
        workspace.join(CONFIG_FILE)
    }

    /// Reads `gradebook.json` from the workspace, writing the defaults there
    /// on first use.
    pub fn load_or_init(workspace: &Path) -> anyhow::Result<Self> {
        let path = Self::config_path(workspace);
        if !path.is_file() {
            let c = Self::default();
            c.save(workspace)?;
            return Ok(c);
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.to_string_lossy()))?;
        Self::from_json(&text).with_context(|| format!("invalid {}", path.to_string_lossy()))
    }

    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let cfg: ConfigFile = serde_json::from_str(text).context("config is not valid JSON")?;
        Self::new(cfg.curriculum)
    }

    pub fn to_json(&self) -> anyhow::Result<String> {
        let cfg = ConfigFile {
            curriculum: self.years.clone(),
        };
        serde_json::to_string_pretty(&cfg).context("failed to serialize curriculum")
    }

    pub fn save(&self, workspace: &Path) -> anyhow::Result<()> {
        std::fs::create_dir_all(workspace).with_context(|| {
            format!("failed to create workspace {}", workspace.to_string_lossy())
        })?;
        let path = Self::config_path(workspace);
        std::fs::write(&path, self.to_json()?)
            .with_context(|| format!("failed to write {}", path.to_string_lossy()))
    }
}

fn check_label(kind: &str, value: &str) -> anyhow::Result<()> {
    if value.trim().is_empty() {
        return Err(anyhow!("{kind} must not be empty"));
    }
    if let Some(c) = value.chars().find(|c| RESERVED.contains(c)) {
        return Err(anyhow!("{kind} {value:?} contains reserved character {c:?}"));
    }
    Ok(())
}
