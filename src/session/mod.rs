// Session state machine
//
// Every read/edit/save entry point is legal from exactly one state;
// calling it from anywhere else is rejected immediately, which is what
// serializes access to the half-duplex transport. The resting state is
// always Idle and a failed read leaves the held snapshot untouched.

use crate::config::{self, Config, ConfigError, Module};
use crate::device::{BatchReader, BatchWriter, DeviceAccess, DeviceError, ProgressFn};
use crate::doc::{DocError, Node};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    GpsLogRead,
    NavRead,
    NavEdit,
    NavSave,
    MmsiRead,
    MmsiEdit,
    MmsiSave,
    YamlRead,
    YamlEdit,
    YamlSave,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::GpsLogRead => "gpslog-read",
            SessionState::NavRead => "nav-read",
            SessionState::NavEdit => "nav-edit",
            SessionState::NavSave => "nav-save",
            SessionState::MmsiRead => "mmsi-read",
            SessionState::MmsiEdit => "mmsi-edit",
            SessionState::MmsiSave => "mmsi-save",
            SessionState::YamlRead => "yaml-read",
            SessionState::YamlEdit => "yaml-edit",
            SessionState::YamlSave => "yaml-save",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot {action} while {state}")]
    InvalidState {
        action: &'static str,
        state: SessionState,
    },

    #[error("Device error: {0}")]
    Device(#[from] DeviceError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Document has {} validation problem(s), first: {}", .0.len(), .0[0])]
    Validation(Vec<DocError>),
}

pub type Result<T> = std::result::Result<T, SessionError>;

/// One of the three edit scopes a session can hold open
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Nav,
    Mmsi,
    Yaml,
}

impl Scope {
    fn modules(self) -> &'static [Module] {
        match self {
            Scope::Nav => Module::NAV,
            Scope::Mmsi => Module::MMSI,
            Scope::Yaml => Module::ALL,
        }
    }

    fn read_state(self) -> SessionState {
        match self {
            Scope::Nav => SessionState::NavRead,
            Scope::Mmsi => SessionState::MmsiRead,
            Scope::Yaml => SessionState::YamlRead,
        }
    }

    fn edit_state(self) -> SessionState {
        match self {
            Scope::Nav => SessionState::NavEdit,
            Scope::Mmsi => SessionState::MmsiEdit,
            Scope::Yaml => SessionState::YamlEdit,
        }
    }

    fn save_state(self) -> SessionState {
        match self {
            Scope::Nav => SessionState::NavSave,
            Scope::Mmsi => SessionState::MmsiSave,
            Scope::Yaml => SessionState::YamlSave,
        }
    }
}

/// A configuration session over one device backend
pub struct Session<A: DeviceAccess> {
    device: A,
    state: SessionState,
    /// Snapshot from the last successful read
    config: Config,
    /// Parsed edits awaiting save
    draft: Option<Config>,
    progress: Option<ProgressFn>,
}

impl<A: DeviceAccess> Session<A> {
    pub fn new(device: A) -> Self {
        Self {
            device,
            state: SessionState::Idle,
            config: Config::default(),
            draft: None,
            progress: None,
        }
    }

    /// Install a progress callback for chunked transfers
    pub fn set_progress(&mut self, progress: ProgressFn) {
        self.progress = Some(progress);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The last-read snapshot
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn device_mut(&mut self) -> &mut A {
        &mut self.device
    }

    pub fn into_device(self) -> A {
        self.device
    }

    fn check_idle(&self, action: &'static str) -> Result<()> {
        if self.state != SessionState::Idle {
            return Err(SessionError::InvalidState {
                action,
                state: self.state,
            });
        }
        Ok(())
    }

    // --- generic scope machinery ------------------------------------------

    async fn read_scope(&mut self, scope: Scope, action: &'static str) -> Result<Node> {
        self.check_idle(action)?;
        self.state = scope.read_state();

        let map = self.device.memory_map();
        let mut reader = BatchReader::new();
        for module in scope.modules() {
            if module.supported(map) {
                module.register_ranges(map, &mut reader);
            }
        }

        let result = async {
            let ranges = reader.run(&mut self.device, self.progress.clone()).await?;
            Ok::<_, SessionError>(config::decode_modules(scope.modules(), map, &ranges)?)
        }
        .await;

        match result {
            Ok(fresh) => {
                tracing::info!(state = %scope.edit_state(), "read complete");
                self.config = fresh;
                self.draft = None;
                self.state = scope.edit_state();
                Ok(config::emit_document(scope.modules(), map, &self.config))
            }
            Err(err) => {
                // Held snapshot stays as it was
                self.state = SessionState::Idle;
                Err(err)
            }
        }
    }

    fn edit_scope(&mut self, scope: Scope, doc: &Node, action: &'static str) -> Result<()> {
        if self.state != scope.edit_state() {
            return Err(SessionError::InvalidState {
                action,
                state: self.state,
            });
        }
        let map = self.device.memory_map();
        let draft = config::parse_document(scope.modules(), map, doc, &self.config)
            .map_err(SessionError::Validation)?;
        self.draft = Some(draft);
        Ok(())
    }

    async fn save_scope(&mut self, scope: Scope, action: &'static str) -> Result<()> {
        if self.state != scope.edit_state() {
            return Err(SessionError::InvalidState {
                action,
                state: self.state,
            });
        }
        let Some(draft) = self.draft.take() else {
            return Err(SessionError::InvalidState {
                action,
                state: self.state,
            });
        };
        self.state = scope.save_state();

        let map = self.device.memory_map();
        let result = async {
            let mut writer = BatchWriter::new();
            for module in scope.modules() {
                if module.supported(map) {
                    module.queue_writes(map, &draft, &mut writer)?;
                }
            }
            writer.run(&mut self.device, self.progress.clone()).await?;
            Ok::<_, SessionError>(())
        }
        .await;

        self.state = SessionState::Idle;
        match result {
            Ok(()) => {
                self.config = draft;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    fn cancel_scope(&mut self, scope: Scope, action: &'static str) -> Result<()> {
        if self.state != scope.edit_state() {
            return Err(SessionError::InvalidState {
                action,
                state: self.state,
            });
        }
        self.draft = None;
        self.state = SessionState::Idle;
        Ok(())
    }

    // --- navigation data --------------------------------------------------

    pub async fn read_nav(&mut self) -> Result<Node> {
        self.read_scope(Scope::Nav, "read navigation data").await
    }

    pub fn edit_nav(&mut self, doc: &Node) -> Result<()> {
        self.edit_scope(Scope::Nav, doc, "edit navigation data")
    }

    pub async fn save_nav(&mut self) -> Result<()> {
        self.save_scope(Scope::Nav, "save navigation data").await
    }

    pub fn cancel_nav(&mut self) -> Result<()> {
        self.cancel_scope(Scope::Nav, "cancel navigation edit")
    }

    // --- DSC directories --------------------------------------------------

    pub async fn read_mmsi(&mut self) -> Result<Node> {
        self.read_scope(Scope::Mmsi, "read directories").await
    }

    pub fn edit_mmsi(&mut self, doc: &Node) -> Result<()> {
        self.edit_scope(Scope::Mmsi, doc, "edit directories")
    }

    pub async fn save_mmsi(&mut self) -> Result<()> {
        self.save_scope(Scope::Mmsi, "save directories").await
    }

    pub fn cancel_mmsi(&mut self) -> Result<()> {
        self.cancel_scope(Scope::Mmsi, "cancel directory edit")
    }

    // --- full document ----------------------------------------------------

    pub async fn read_all(&mut self) -> Result<Node> {
        self.read_scope(Scope::Yaml, "read configuration").await
    }

    pub fn edit_all(&mut self, doc: &Node) -> Result<()> {
        self.edit_scope(Scope::Yaml, doc, "edit configuration")
    }

    pub async fn save_all(&mut self) -> Result<()> {
        self.save_scope(Scope::Yaml, "save configuration").await
    }

    pub fn cancel_all(&mut self) -> Result<()> {
        self.cancel_scope(Scope::Yaml, "cancel configuration edit")
    }

    // --- GPS log ----------------------------------------------------------

    pub async fn read_gps_log(&mut self) -> Result<Vec<u8>> {
        self.check_idle("read GPS log")?;
        self.state = SessionState::GpsLogRead;
        let result = self.device.read_gps_log(self.progress.as_ref()).await;
        self.state = SessionState::Idle;
        Ok(result?)
    }
}
