use std::fmt;
use std::str::FromStr;

/// Recognized QTYPE strings and their numeric codes (§4.A). Parsing is
/// case-sensitive, matching the grammar in the specification.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum QType {
    A,
    Ns,
    Md,
    Mf,
    Cname,
    Soa,
    Mb,
    Mg,
    Mr,
    Null,
    Wks,
    Ptr,
    Hinfo,
    Minfo,
    Mx,
    Txt,
    Aaaa,
    Axfr,
    Mailb,
    Maila,
    Any,
}

impl QType {
    pub fn code(self) -> u16 {
        match self {
            QType::A => 1,
            QType::Ns => 2,
            QType::Md => 3,
            QType::Mf => 4,
            QType::Cname => 5,
            QType::Soa => 6,
            QType::Mb => 7,
            QType::Mg => 8,
            QType::Mr => 9,
            QType::Null => 10,
            QType::Wks => 11,
            QType::Ptr => 12,
            QType::Hinfo => 13,
            QType::Minfo => 14,
            QType::Mx => 15,
            QType::Txt => 16,
            QType::Aaaa => 28,
            QType::Axfr => 252,
            QType::Mailb => 253,
            QType::Maila => 254,
            QType::Any => 255,
        }
    }
}

impl fmt::Display for QType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// The qtype string from an input line did not match the recognized table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Query type not understood: {0}")]
pub struct UnknownQType(pub String);

impl FromStr for QType {
    type Err = UnknownQType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(QType::A),
            "NS" => Ok(QType::Ns),
            "MD" => Ok(QType::Md),
            "MF" => Ok(QType::Mf),
            "CNAME" => Ok(QType::Cname),
            "SOA" => Ok(QType::Soa),
            "MB" => Ok(QType::Mb),
            "MG" => Ok(QType::Mg),
            "MR" => Ok(QType::Mr),
            "NULL" => Ok(QType::Null),
            "WKS" => Ok(QType::Wks),
            "PTR" => Ok(QType::Ptr),
            "HINFO" => Ok(QType::Hinfo),
            "MINFO" => Ok(QType::Minfo),
            "MX" => Ok(QType::Mx),
            "TXT" => Ok(QType::Txt),
            "AAAA" => Ok(QType::Aaaa),
            "AXFR" => Ok(QType::Axfr),
            "MAILB" => Ok(QType::Mailb),
            "MAILA" => Ok(QType::Maila),
            "*" | "ANY" => Ok(QType::Any),
            other => Err(UnknownQType(other.to_string())),
        }
    }
}
