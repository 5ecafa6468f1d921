use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Local;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::api::{self, Cursor, DistributionRepo, SnapshotId, StoredSnapshot};
use crate::core::distribute::Distribution;
use crate::core::finance::Percentage;
use crate::core::planning::{ItemSpec, Op, OperationRule, Profile, ValueRule};

#[derive(Debug)]
pub enum Error {
    CantReadProfile,
    CantParseProfile,
    InvalidProfile(String),
    CantReadSnapshot,
    CantParseSnapshot,
}

#[derive(Deserialize)]
struct Root {
    pub profile: ProfileDetails,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProfileDetails {
    pub name: String,
    pub items: Vec<Item>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Item {
    pub id: String,
    #[serde(default)]
    pub order: i32,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub value: String,
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub reference: Option<String>,
    pub operation: String,
    #[serde(default)]
    pub operand: Option<String>,
}

fn value_rule(item: &Item) -> Result<ValueRule, Error> {
    let amount = || {
        item.amount
            .ok_or_else(|| Error::InvalidProfile(format!("item '{}' needs an amount", item.id)))
    };
    match item.value.as_str() {
        "total_income" => Ok(ValueRule::TotalIncome),
        "total_expense" => Ok(ValueRule::TotalExpense),
        "fixed" => Ok(ValueRule::Fixed { amount: amount()? }),
        "percent_of_income" => Ok(ValueRule::PercentOfIncome {
            rate: Percentage::from(amount()?),
        }),
        "percent_of_expense" => Ok(ValueRule::PercentOfExpense {
            rate: Percentage::from(amount()?),
        }),
        "reference" => item
            .reference
            .as_deref()
            .map(|id| ValueRule::Reference { item: id.into() })
            .ok_or_else(|| {
                Error::InvalidProfile(format!("item '{}' needs a reference", item.id))
            }),
        other => Err(Error::InvalidProfile(format!(
            "item '{}': unknown value type '{other}'",
            item.id
        ))),
    }
}

fn operation_rule(item: &Item) -> Result<OperationRule, Error> {
    let op = match item.operation.as_str() {
        "set" => Op::Set,
        "add" => Op::Add,
        "subtract" => Op::Subtract,
        "multiply" => Op::Multiply,
        "divide" => Op::Divide,
        other => {
            return Err(Error::InvalidProfile(format!(
                "item '{}': unknown operation '{other}'",
                item.id
            )));
        }
    };
    Ok(OperationRule {
        op,
        operand: item.operand.as_deref().map(Into::into),
    })
}

fn yaml_to_domain(yaml: ProfileDetails) -> Result<Profile, Error> {
    let items = yaml
        .items
        .iter()
        .map(|i| {
            Ok(ItemSpec {
                id: i.id.as_str().into(),
                order_index: i.order,
                name: i.name.clone(),
                description: i.description.clone(),
                value: value_rule(i)?,
                operation: operation_rule(i)?,
            })
        })
        .collect::<Result<Vec<_>, Error>>()?;
    Ok(Profile::new(yaml.name, items))
}

/// Parses a YAML file into a distribution profile.
///
/// # Errors
/// - `CantReadProfile` - the file cannot be read
/// - `CantParseProfile` - the file is not valid YAML
/// - `InvalidProfile` - an item carries an unknown value type or operation,
///   or is missing a field its value type needs
pub fn profile_from_yaml(path: &Path) -> Result<Profile, Error> {
    let yaml_data = fs::read_to_string(path).map_err(|e| {
        error!("cannot read profile: {e}");
        Error::CantReadProfile
    })?;
    let root: Root = serde_yaml::from_str(&yaml_data).map_err(|e| {
        error!("cannot parse profile: {e}");
        Error::CantParseProfile
    })?;
    yaml_to_domain(root.profile)
}

/// Reads a stored distribution snapshot back from JSON.
///
/// # Errors
/// - `CantReadSnapshot` - the file cannot be read
/// - `CantParseSnapshot` - the file is not a valid snapshot
pub fn snapshot_from_json(path: &Path) -> Result<Distribution, Error> {
    let json_data = fs::read_to_string(path).map_err(|e| {
        error!("cannot read snapshot: {e}");
        Error::CantReadSnapshot
    })?;

    serde_json::from_str(&json_data).map_err(|e| {
        error!("cannot parse snapshot {:?}: {e}", path.file_name());
        Error::CantParseSnapshot
    })
}

#[derive(Debug)]
pub struct FileSystem {
    root_dir: PathBuf,
    profile_path: PathBuf,
    snapshots_path: PathBuf,
}

impl FileSystem {
    const DEFAULT_PROFILE_CONTENT: &'static str = include_str!("default_profile.yaml");

    fn root(&self) -> &PathBuf {
        &self.root_dir
    }

    fn profile_path(&self) -> &PathBuf {
        &self.profile_path
    }

    fn snapshots_path(&self) -> &PathBuf {
        &self.snapshots_path
    }

    /// Creates the storage layout: root dir, snapshots dir, default profile.
    fn prepare_storage(&self, default_profile_content: &str) -> Result<(), String> {
        let root = &self.root_dir;
        info!("storage not found, initializing: {}", root.display());
        if root.exists() {
            return Err(format!("storage already initialized: {}", root.display()));
        }
        fs::create_dir_all(root).map_err(|e| format!("cannot create storage dir: {e}"))?;
        info!("created directory: {}", root.display());
        fs::create_dir_all(self.snapshots_path())
            .map_err(|e| format!("cannot create snapshots dir: {e}"))?;
        info!("created directory: {}", self.snapshots_path().display());
        if !self.profile_path().exists() {
            fs::write(self.profile_path(), default_profile_content)
                .map_err(|e| format!("cannot create profile.yaml: {e}"))?;
            info!(
                "created profile with an example: {}",
                self.profile_path().display()
            );
            info!("edit this file to match your settlement profile before use");
        }
        info!("storage initialized: {}", root.display());
        Ok(())
    }

    /// Initializes the storage if needed and returns the repository.
    ///
    /// # Errors
    /// Returns a message when the layout cannot be created.
    pub fn init<P: AsRef<Path>>(root_dir: P) -> Result<Self, String> {
        let root_dir = root_dir.as_ref().to_path_buf();
        let fs = Self {
            profile_path: root_dir.join("profile.yaml"),
            snapshots_path: root_dir.join("distributions"),
            root_dir,
        };
        if fs.root_dir.exists() && fs.profile_path().exists() && fs.snapshots_path().exists() {
            return Ok(fs);
        }
        fs.prepare_storage(Self::DEFAULT_PROFILE_CONTENT)?;
        info!(fs = ?fs);
        Ok(fs)
    }

    fn full_storage(&self) -> impl Iterator<Item = SnapshotId> {
        let mut files: Vec<_> = match fs::read_dir(self.snapshots_path()) {
            Ok(rd) => rd
                .filter_map(|e| {
                    let path = e.ok()?.path();
                    if path.extension().is_some_and(|ext| ext == "json") {
                        path.file_name()
                            .map(|os_str| os_str.to_string_lossy().to_string())
                    } else {
                        None
                    }
                })
                .collect(),
            Err(_) => Vec::new(),
        };
        // Newest first: ids are date-stamped
        files.sort_by(|a, b| b.cmp(a));
        files.into_iter()
    }
}

impl DistributionRepo for FileSystem {
    fn location(&self) -> &str {
        self.root().to_str().unwrap_or_default()
    }

    fn get_profile(&self) -> Option<Profile> {
        profile_from_yaml(self.profile_path()).ok()
    }

    fn save_snapshot(&self, distribution: Distribution) -> Result<SnapshotId, api::Error> {
        let filename: SnapshotId = format!("{}.json", Local::now().format("%Y-%m-%dT%H-%M-%S"));
        let result_path = &self.snapshots_path().join(&filename);
        let mut file = File::create(result_path).map_err(|_| api::Error::CantSaveSnapshot)?;

        let json_result = serde_json::to_string_pretty(&distribution)
            .map_err(|_| api::Error::CantSaveSnapshot)?;
        file.write_all(json_result.as_bytes())
            .map_err(|_| api::Error::CantSaveSnapshot)?;

        info!("written to {result_path:?}");
        Ok(filename)
    }

    fn snapshot_ids<'r>(
        &'r self,
        from: Option<Cursor>,
        limit: usize,
    ) -> Box<dyn Iterator<Item = SnapshotId> + 'r> {
        let files: Vec<_> = self.full_storage().collect();
        let start = from
            .as_ref()
            .and_then(|cursor| files.iter().position(|p| p == cursor))
            .map_or(0, |idx| idx + 1);
        let files: Vec<_> = files.into_iter().skip(start).take(limit).collect();
        Box::new(files.into_iter())
    }

    fn snapshot_by_id(&self, id: &SnapshotId) -> Option<StoredSnapshot> {
        let path = self.snapshots_path().join(id);
        match snapshot_from_json(&path) {
            Ok(distribution) => {
                info!(distribution = ?distribution, id = id);
                Some(StoredSnapshot {
                    id: id.clone(),
                    distribution,
                })
            }
            Err(e) => {
                error!("could not load snapshot {id}: {e:?}");
                None
            }
        }
    }
}
