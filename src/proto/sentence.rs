// CP-mode wire sentence framing
// Two shapes share one model:
//   command:  #TYPE\tARG...\tCS\r\n
//   NMEA:     $TYPE,ARG,...*CS\r\n

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SentenceError {
    #[error("Empty sentence")]
    Empty,

    #[error("Sentence does not start with '#' or '$': {0:?}")]
    BadSigil(String),

    #[error("Missing sentence type")]
    MissingType,

    #[error("Missing checksum field in {0:?}")]
    MissingChecksum(String),

    #[error("Malformed checksum field {0:?}")]
    BadChecksumField(String),
}

pub type Result<T> = std::result::Result<T, SentenceError>;

/// Sentence terminator on the wire
pub const TERMINATOR: &str = "\r\n";

/// Command types that carry neither arguments nor a checksum
pub const UNARY_TYPES: &[&str] = &["CMDOK", "CMDER", "CMDUN", "CMDSM", "CMDSY"];

/// Which of the two wire shapes a sentence uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentenceKind {
    /// '#'-prefixed, tab-separated command/response
    Command,
    /// '$'-prefixed, comma-separated NMEA-like telemetry
    Nmea,
}

/// One parsed or constructed wire sentence
///
/// Parsing never rejects a sentence for a checksum mismatch; both the
/// received and the locally computed value are kept and the caller decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sentence {
    pub kind: SentenceKind,
    pub stype: String,
    pub args: Vec<String>,
    /// Checksum as received off the wire, None for unary commands
    pub received_checksum: Option<u8>,
    /// Checksum computed locally from the sentence bytes, None for unary commands
    pub computed_checksum: Option<u8>,
}

impl Sentence {
    /// Build a command sentence, computing the checksum unless the type is unary
    pub fn command(stype: &str, args: &[&str]) -> Self {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let checksum = if is_unary(stype) {
            None
        } else {
            Some(command_checksum(stype, &args))
        };
        Self {
            kind: SentenceKind::Command,
            stype: stype.to_string(),
            args,
            received_checksum: checksum,
            computed_checksum: checksum,
        }
    }

    /// Build an NMEA sentence with its checksum
    pub fn nmea(stype: &str, args: &[&str]) -> Self {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        let checksum = nmea_checksum(stype, &args);
        Self {
            kind: SentenceKind::Nmea,
            stype: stype.to_string(),
            args,
            received_checksum: Some(checksum),
            computed_checksum: Some(checksum),
        }
    }

    /// Parse one sentence (with or without trailing CR/LF)
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        let mut chars = line.chars();
        match chars.next() {
            Some('#') => parse_command(line),
            Some('$') => parse_nmea(line),
            Some(_) => Err(SentenceError::BadSigil(line.to_string())),
            None => Err(SentenceError::Empty),
        }
    }

    /// Serialize to the exact wire form including the terminator
    pub fn encode(&self) -> String {
        let mut out = String::new();
        match self.kind {
            SentenceKind::Command => {
                out.push('#');
                out.push_str(&self.stype);
                for arg in &self.args {
                    out.push('\t');
                    out.push_str(arg);
                }
                if let Some(cs) = self.computed_checksum {
                    out.push('\t');
                    out.push_str(&format!("{:02X}", cs));
                }
            }
            SentenceKind::Nmea => {
                out.push('$');
                out.push_str(&self.stype);
                for arg in &self.args {
                    out.push(',');
                    out.push_str(arg);
                }
                out.push('*');
                out.push_str(&format!(
                    "{:02X}",
                    self.computed_checksum.unwrap_or_default()
                ));
            }
        }
        out.push_str(TERMINATOR);
        out
    }

    /// True when the received checksum matches the computed one (or the
    /// sentence carries none at all)
    pub fn checksum_ok(&self) -> bool {
        self.received_checksum == self.computed_checksum
    }
}

/// True for command types that carry no args and no checksum
pub fn is_unary(stype: &str) -> bool {
    UNARY_TYPES.contains(&stype)
}

/// XOR-fold the command sentence bytes up to the checksum token
///
/// Byte value 0x21 is excluded from the fold on this sentence shape.
fn command_checksum(stype: &str, args: &[String]) -> u8 {
    let mut body = String::from("#");
    body.push_str(stype);
    for arg in args {
        body.push('\t');
        body.push_str(arg);
    }
    body.push('\t');
    body.bytes().filter(|&b| b != 0x21).fold(0, |acc, b| acc ^ b)
}

/// XOR-fold the bytes between '$' and '*'
fn nmea_checksum(stype: &str, args: &[String]) -> u8 {
    let mut body = String::from(stype);
    for arg in args {
        body.push(',');
        body.push_str(arg);
    }
    body.bytes().fold(0, |acc, b| acc ^ b)
}

fn parse_hex_checksum(field: &str) -> Result<u8> {
    if field.len() != 2 {
        return Err(SentenceError::BadChecksumField(field.to_string()));
    }
    u8::from_str_radix(field, 16).map_err(|_| SentenceError::BadChecksumField(field.to_string()))
}

fn parse_command(line: &str) -> Result<Sentence> {
    let body = &line[1..];
    let mut fields: Vec<&str> = body.split('\t').collect();
    let stype = fields.first().copied().unwrap_or_default();
    if stype.is_empty() {
        return Err(SentenceError::MissingType);
    }

    if is_unary(stype) {
        return Ok(Sentence {
            kind: SentenceKind::Command,
            stype: stype.to_string(),
            args: Vec::new(),
            received_checksum: None,
            computed_checksum: None,
        });
    }

    if fields.len() < 2 {
        return Err(SentenceError::MissingChecksum(line.to_string()));
    }
    let received = parse_hex_checksum(fields.pop().unwrap())?;
    let args: Vec<String> = fields[1..].iter().map(|s| s.to_string()).collect();
    let computed = command_checksum(stype, &args);

    Ok(Sentence {
        kind: SentenceKind::Command,
        stype: stype.to_string(),
        args,
        received_checksum: Some(received),
        computed_checksum: Some(computed),
    })
}

fn parse_nmea(line: &str) -> Result<Sentence> {
    let body = &line[1..];
    let (body, cs_field) = body
        .rsplit_once('*')
        .ok_or_else(|| SentenceError::MissingChecksum(line.to_string()))?;
    let received = parse_hex_checksum(cs_field)?;

    let mut fields = body.split(',');
    let stype = fields.next().unwrap_or_default();
    if stype.is_empty() {
        return Err(SentenceError::MissingType);
    }
    let args: Vec<String> = fields.map(|s| s.to_string()).collect();
    let computed = nmea_checksum(stype, &args);

    Ok(Sentence {
        kind: SentenceKind::Nmea,
        stype: stype.to_string(),
        args,
        received_checksum: Some(received),
        computed_checksum: Some(computed),
    })
}
