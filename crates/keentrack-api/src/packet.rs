// Command packet codec
//
// The router's command interface speaks a nested XML-RPC-like format:
// a `<packet ref="/">` envelope carrying one `<request id="...">` per
// command. Responses come back positionally, one `<response>` per
// request, in request order. Encoding is plain string assembly; decoding
// goes through roxmltree and extracts the station/lease result lists.

use roxmltree::{Document, Node};

use crate::error::Error;
use crate::models::{Lease, PollSnapshot, Station};

/// One named `show` command inside a request packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShowCommand {
    pub id: String,
    pub name: String,
    pub args: Vec<(String, String)>,
}

impl ShowCommand {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.args.push((key.into(), value.into()));
        self
    }

    /// `show associations` — active radio clients.
    pub fn associations() -> Self {
        Self::new("associations", "show associations")
    }

    /// `show ip dhcp bindings` for the given pool — DHCP leases.
    pub fn dhcp_bindings(pool: &str) -> Self {
        Self::new("bindings", "show ip dhcp bindings").arg("pool", pool)
    }
}

/// Encode a set of commands into the router's request packet.
pub fn encode_packet(commands: &[ShowCommand]) -> String {
    let mut xml = String::from("<packet ref=\"/\">");
    for command in commands {
        xml.push_str(&format!(
            "<request id=\"{}\"><command name=\"{}\">",
            xml_escape(&command.id),
            xml_escape(&command.name)
        ));
        for (key, value) in &command.args {
            xml.push_str(&format!(
                "<{key}>{}</{key}>",
                xml_escape(value),
                key = xml_escape(key)
            ));
        }
        xml.push_str("</command></request>");
    }
    xml.push_str("</packet>");
    xml
}

/// Decode a response packet into station and lease lists.
///
/// Responses are positional: the first `<response>` answers the
/// associations request, the second the bindings request. A single
/// `<station>` or `<lease>` entry always decodes to a one-element list;
/// zero entries is a valid empty list. A malformed envelope or an entry
/// missing a mandatory field is an [`Error::Decode`].
pub fn decode_packet(xml: &str) -> Result<PollSnapshot, Error> {
    let doc = Document::parse(xml).map_err(|e| Error::Decode {
        message: format!("invalid XML: {e}"),
    })?;

    let root = doc.root_element();
    if root.tag_name().name() != "packet" {
        return Err(shape(format!(
            "expected <packet> root, found <{}>",
            root.tag_name().name()
        )));
    }

    let responses: Vec<Node<'_, '_>> = root
        .children()
        .filter(|n| n.has_tag_name("response"))
        .collect();
    let (Some(associations), Some(bindings)) = (responses.first(), responses.get(1)) else {
        return Err(shape(format!(
            "expected 2 response entries, found {}",
            responses.len()
        )));
    };

    let stations = associations
        .children()
        .filter(|n| n.has_tag_name("station"))
        .map(parse_station)
        .collect::<Result<Vec<_>, _>>()?;

    let leases = bindings
        .children()
        .filter(|n| n.has_tag_name("lease"))
        .map(parse_lease)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PollSnapshot { stations, leases })
}

fn parse_station(node: Node<'_, '_>) -> Result<Station, Error> {
    let mac = required_text(node, "mac")?;
    let rssi = required_text(node, "rssi")?;
    let rssi = rssi.parse::<i32>().map_err(|_| Error::Decode {
        message: format!("station {mac}: rssi is not an integer: {rssi:?}"),
    })?;
    Ok(Station { mac, rssi })
}

fn parse_lease(node: Node<'_, '_>) -> Result<Lease, Error> {
    Ok(Lease {
        mac: required_text(node, "mac")?,
        ip: required_text(node, "ip")?,
        name: child_text(node, "name"),
        hostname: child_text(node, "hostname"),
    })
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.children()
        .find(|c| c.has_tag_name(name))
        .and_then(|c| c.text())
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
}

fn required_text(node: Node<'_, '_>, name: &str) -> Result<String, Error> {
    child_text(node, name).ok_or_else(|| {
        shape(format!(
            "<{}> entry is missing <{name}>",
            node.tag_name().name()
        ))
    })
}

fn shape(message: String) -> Error {
    Error::Decode { message }
}

fn xml_escape(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
