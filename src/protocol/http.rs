use super::pkt_line::{PktLine, PktLines};
use crate::id::ObjectId;
use crate::{Error, Result};
use reqwest::header::{HeaderValue, CONTENT_TYPE};

const UPLOAD_PACK_REQUEST: &str = "application/x-git-upload-pack-request";
const MASTER_REF: &str = "refs/heads/master";
const BRANCH_PREFIX: &str = "refs/heads/";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdvertisedRef {
    pub id: ObjectId,
    pub name: String,
}

/// Smart-HTTP peer: one GET for ref discovery, one POST for the pack.
#[derive(Debug)]
pub struct Remote {
    url: String,
    client: reqwest::Client,
}

impl Remote {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub async fn discover_refs(&self) -> Result<Vec<AdvertisedRef>> {
        let res = self
            .client
            .get(format!("{}/info/refs?service=git-upload-pack", self.url))
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(Error::Remote(format!(
                "ref discovery failed with status {}",
                res.status()
            )));
        }
        let body = res.bytes().await?;
        if body.is_empty() {
            return Err(Error::Remote("ref discovery returned an empty body".into()));
        }
        parse_advertisement(&body)
    }

    /// want / flush / done, then the pack body (side-band or raw).
    pub async fn fetch_pack(&self, want: ObjectId) -> Result<Vec<u8>> {
        let request = format!(
            "{}{}{}",
            PktLine::text(&format!("want {want} side-band-64k\n")),
            PktLine::Flush,
            PktLine::text("done\n"),
        );
        let res = self
            .client
            .post(format!("{}/git-upload-pack", self.url))
            .header(CONTENT_TYPE, HeaderValue::from_static(UPLOAD_PACK_REQUEST))
            .body(request)
            .send()
            .await?;
        if !res.status().is_success() {
            return Err(Error::Remote(format!(
                "upload-pack failed with status {}",
                res.status()
            )));
        }
        let body = res.bytes().await?;
        if body.is_empty() {
            return Err(Error::Remote("upload-pack returned an empty body".into()));
        }
        extract_pack(&body)
    }
}

/// Parses `(id, refname)` pairs, skipping the `# service=` banner and
/// stripping the capability list after the first NUL.
pub fn parse_advertisement(body: &[u8]) -> Result<Vec<AdvertisedRef>> {
    let mut refs = Vec::new();
    for line in PktLines::new(body) {
        let payload = match line? {
            PktLine::Data(payload) => payload,
            _ => continue,
        };
        if payload.starts_with(b"# service=") {
            continue;
        }

        let bare = match payload.iter().position(|&b| b == b'\0') {
            Some(pos) => &payload[..pos],
            None => &payload[..],
        };
        let text = String::from_utf8_lossy(bare);
        let text = text.trim_end_matches('\n');
        if text.is_empty() {
            continue;
        }
        let (id, name) = text
            .split_once(' ')
            .ok_or_else(|| Error::codec(format!("malformed ref advertisement: {text}")))?;
        refs.push(AdvertisedRef {
            id: ObjectId::from_hex(id)?,
            name: name.to_string(),
        });
    }
    Ok(refs)
}

/// Picks the commit to clone: `refs/heads/master` when advertised, else
/// the dereferenced HEAD. Returns the id with the branch to record.
pub fn select_target(refs: &[AdvertisedRef]) -> Result<(ObjectId, String)> {
    if let Some(master) = refs.iter().find(|r| r.name == MASTER_REF) {
        return Ok((master.id, "master".into()));
    }
    let head = refs
        .iter()
        .find(|r| r.name == "HEAD")
        .ok_or_else(|| Error::Remote("remote advertised neither master nor HEAD".into()))?;
    let branch = refs
        .iter()
        .filter(|r| r.id == head.id)
        .find_map(|r| r.name.strip_prefix(BRANCH_PREFIX))
        .unwrap_or("master")
        .to_string();
    Ok((head.id, branch))
}

/// Recovers the raw packfile from an upload-pack response body.
fn extract_pack(body: &[u8]) -> Result<Vec<u8>> {
    let mut lines = PktLines::new(body);
    loop {
        // A server that skipped side-band sends the pack unframed after
        // its ACK/NAK chatter.
        if lines.rest().starts_with(b"PACK") {
            return Ok(lines.rest().to_vec());
        }
        let Some(line) = lines.next() else {
            return Err(Error::pack("response ended before any pack data"));
        };
        let payload = match line? {
            PktLine::Data(payload) => payload,
            _ => continue,
        };
        if payload.starts_with(b"NAK") || payload.starts_with(b"ACK") {
            continue;
        }
        return demux_side_band(payload, lines);
    }
}

fn demux_side_band(first: Vec<u8>, lines: PktLines) -> Result<Vec<u8>> {
    let mut pack = Vec::new();
    absorb_frame(&mut pack, &first)?;
    for line in lines {
        match line? {
            PktLine::Data(payload) => absorb_frame(&mut pack, &payload)?,
            PktLine::Flush => break,
            _ => continue,
        }
    }
    Ok(pack)
}

fn absorb_frame(pack: &mut Vec<u8>, payload: &[u8]) -> Result<()> {
    match payload.split_first() {
        Some((1, data)) => {
            pack.extend_from_slice(data);
            Ok(())
        }
        Some((2, progress)) => {
            for line in progress_lines(progress) {
                eprintln!("remote: {line}");
            }
            Ok(())
        }
        Some((3, message)) => Err(Error::Remote(
            String::from_utf8_lossy(message).trim().to_string(),
        )),
        _ => Err(Error::pack("unexpected pkt-line in upload-pack response")),
    }
}

fn progress_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .replace('\r', "\n")
        .trim_end_matches('\n')
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(|line| line.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advertisement(extra_refs: &[(&str, &str)]) -> Vec<u8> {
        let mut body = PktLine::text("# service=git-upload-pack\n").to_string();
        body.push_str(&PktLine::Flush.to_string());
        for (i, (id, name)) in extra_refs.iter().enumerate() {
            let caps = if i == 0 { "\0side-band-64k ofs-delta" } else { "" };
            body.push_str(&PktLine::text(&format!("{id} {name}{caps}\n")).to_string());
        }
        body.push_str(&PktLine::Flush.to_string());
        body.into_bytes()
    }

    const HEAD_ID: &str = "3b1031798a00fdf9b574b5857b1721bc4b0e6bac";
    const OTHER_ID: &str = "c4bf7555e2eb4a2b55c7404c742e7e95017ec850";

    #[test]
    fn it_parses_refs_and_strips_capabilities() {
        let body = advertisement(&[(HEAD_ID, "HEAD"), (HEAD_ID, "refs/heads/master")]);
        let refs = parse_advertisement(&body).unwrap();
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].name, "HEAD");
        assert_eq!(refs[0].id, ObjectId::from_hex(HEAD_ID).unwrap());
        assert_eq!(refs[1].name, "refs/heads/master");
    }

    #[test]
    fn it_selects_master_even_when_head_is_advertised_first() {
        let refs = parse_advertisement(&advertisement(&[
            (OTHER_ID, "HEAD"),
            (OTHER_ID, "refs/heads/main"),
            (HEAD_ID, "refs/heads/master"),
        ]))
        .unwrap();
        let (id, branch) = select_target(&refs).unwrap();
        assert_eq!(id, ObjectId::from_hex(HEAD_ID).unwrap());
        assert_eq!(branch, "master");
    }

    #[test]
    fn it_falls_back_to_head_and_names_its_branch() {
        let refs = parse_advertisement(&advertisement(&[
            (HEAD_ID, "HEAD"),
            (HEAD_ID, "refs/heads/main"),
            (OTHER_ID, "refs/heads/feature"),
        ]))
        .unwrap();
        let (id, branch) = select_target(&refs).unwrap();
        assert_eq!(id, ObjectId::from_hex(HEAD_ID).unwrap());
        assert_eq!(branch, "main");
    }

    #[test]
    fn it_fails_without_master_or_head() {
        let refs = parse_advertisement(&advertisement(&[(OTHER_ID, "refs/tags/v1.0")])).unwrap();
        assert!(select_target(&refs).is_err());
    }

    #[test]
    fn it_extracts_a_side_band_pack() {
        let mut body = PktLine::text("NAK\n").to_string().into_bytes();
        let mut frame1 = vec![1u8];
        frame1.extend_from_slice(b"PACKdata-one-");
        let mut progress = vec![2u8];
        progress.extend_from_slice(b"Counting objects: 3\r");
        let mut frame2 = vec![1u8];
        frame2.extend_from_slice(b"data-two");
        for frame in [frame1, progress, frame2] {
            body.extend(format!("{:04x}", frame.len() + 4).into_bytes());
            body.extend(frame);
        }
        body.extend_from_slice(b"0000");

        assert_eq!(extract_pack(&body).unwrap(), b"PACKdata-one-data-two");
    }

    #[test]
    fn it_extracts_a_raw_pack_after_nak() {
        let mut body = PktLine::text("NAK\n").to_string().into_bytes();
        body.extend_from_slice(b"PACKrawbytes");
        assert_eq!(extract_pack(&body).unwrap(), b"PACKrawbytes");
    }

    #[test]
    fn it_surfaces_a_remote_error_band() {
        let mut body = PktLine::text("NAK\n").to_string().into_bytes();
        let mut frame = vec![3u8];
        frame.extend_from_slice(b"fatal: not our ref\n");
        body.extend(format!("{:04x}", frame.len() + 4).into_bytes());
        body.extend(frame);
        body.extend_from_slice(b"0000");

        assert!(matches!(extract_pack(&body), Err(Error::Remote(_))));
    }

    #[test]
    fn it_errors_when_no_pack_data_arrives() {
        let body = PktLine::text("NAK\n").to_string().into_bytes();
        assert!(matches!(
            extract_pack(&body),
            Err(Error::PackFormat(_))
        ));
    }
}
