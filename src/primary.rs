use crate::{
    error::{InspectError, InspectResult},
    package::PackageRecord,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use std::io::BufRead;

fn attribute(element: &BytesStart<'_>, key: &[u8]) -> InspectResult<Option<String>> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Repository-relative location of the primary package list, read from
/// `data[@type="primary"]/location/@href`.
pub fn primary_location(repomd: &str) -> InspectResult<String> {
    let mut reader = Reader::from_str(repomd);
    let mut in_primary = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.local_name().as_ref() == b"data" => {
                in_primary = attribute(&e, b"type")?.as_deref() == Some("primary");
            }
            Event::End(e) if e.local_name().as_ref() == b"data" => in_primary = false,
            Event::Start(e) | Event::Empty(e)
                if in_primary && e.local_name().as_ref() == b"location" =>
            {
                return attribute(&e, b"href")?.ok_or_else(|| {
                    InspectError::MalformedIndex(
                        "primary <location> in repomd.xml has no href".to_string(),
                    )
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Err(InspectError::MalformedIndex(
        "repomd.xml lists no primary package index".to_string(),
    ))
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Name,
    Arch,
}

#[derive(Debug, Clone)]
pub struct PrimaryPackage {
    pub name: String,
    pub ver: Option<String>,
    pub rel: Option<String>,
    pub arch: Option<String>,
    events: Vec<Event<'static>>,
}

impl PrimaryPackage {
    /// `ver-rel`, or just `ver` when the release attribute is absent.
    pub fn version(&self) -> InspectResult<String> {
        let ver = self.ver.as_deref().ok_or_else(|| {
            InspectError::MalformedIndex(format!("package '{}' has no version", self.name))
        })?;
        match self.rel.as_deref() {
            Some(rel) if !rel.is_empty() => Ok(format!("{}-{}", ver, rel)),
            _ => Ok(ver.to_string()),
        }
    }

    pub fn record(&self) -> InspectResult<PackageRecord> {
        let arch = self.arch.as_deref().ok_or_else(|| {
            InspectError::MalformedIndex(format!("package '{}' has no arch", self.name))
        })?;
        Ok(PackageRecord::new(self.name.clone(), self.version()?).with_arch(arch))
    }

    pub fn to_xml(&self) -> InspectResult<String> {
        let mut writer = Writer::new(Vec::new());
        for event in &self.events {
            writer.write_event(event.clone())?;
        }
        Ok(String::from_utf8(writer.into_inner())?)
    }
}

pub struct PrimaryScanner<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    capture: bool,
    done: bool,
}

impl<R: BufRead> PrimaryScanner<R> {
    pub fn new(input: R) -> Self {
        Self {
            reader: Reader::from_reader(input),
            buf: Vec::new(),
            capture: false,
            done: false,
        }
    }

    pub fn capturing(input: R) -> Self {
        Self {
            capture: true,
            ..Self::new(input)
        }
    }

    fn next_package(&mut self) -> InspectResult<Option<PrimaryPackage>> {
        loop {
            self.buf.clear();
            let start = match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) if e.local_name().as_ref() == b"package" => e.into_owned(),
                Event::Eof => return Ok(None),
                _ => continue,
            };
            return self.read_package(start).map(Some);
        }
    }

    fn read_package(&mut self, start: BytesStart<'static>) -> InspectResult<PrimaryPackage> {
        let mut package = PrimaryPackage {
            name: String::new(),
            ver: None,
            rel: None,
            arch: None,
            events: Vec::new(),
        };
        let mut has_name = false;
        if self.capture {
            package.events.push(Event::Start(start));
        }

        let mut depth = 0usize;
        let mut field = None;
        loop {
            self.buf.clear();
            let event = self.reader.read_event_into(&mut self.buf)?;
            let mut finished = false;
            match &event {
                Event::Start(e) => {
                    if depth == 0 {
                        field = match e.name().as_ref() {
                            b"name" => Some(Field::Name),
                            b"arch" => Some(Field::Arch),
                            b"version" => {
                                package.ver = attribute(e, b"ver")?;
                                package.rel = attribute(e, b"rel")?;
                                None
                            }
                            _ => None,
                        };
                    }
                    depth += 1;
                }
                Event::Empty(e) => {
                    if depth == 0 && e.name().as_ref() == b"version" {
                        package.ver = attribute(e, b"ver")?;
                        package.rel = attribute(e, b"rel")?;
                    }
                }
                Event::Text(t) if depth == 1 => match field {
                    Some(Field::Name) => {
                        package.name.push_str(&t.unescape()?);
                        has_name = true;
                    }
                    Some(Field::Arch) => package
                        .arch
                        .get_or_insert_with(String::new)
                        .push_str(&t.unescape()?),
                    None => {}
                },
                Event::CData(c) if depth == 1 => {
                    let text = String::from_utf8_lossy(c);
                    match field {
                        Some(Field::Name) => {
                            package.name.push_str(&text);
                            has_name = true;
                        }
                        Some(Field::Arch) => {
                            package.arch.get_or_insert_with(String::new).push_str(&text)
                        }
                        None => {}
                    }
                }
                Event::End(_) => {
                    if depth == 0 {
                        finished = true;
                    } else {
                        depth -= 1;
                        if depth == 0 {
                            field = None;
                        }
                    }
                }
                Event::Eof => {
                    return Err(InspectError::MalformedIndex(
                        "document ended inside a <package> element".to_string(),
                    ));
                }
                _ => {}
            }
            if self.capture {
                package.events.push(event.into_owned());
            }
            if finished {
                break;
            }
        }

        if !has_name || package.name.trim().is_empty() {
            return Err(InspectError::MalformedIndex(
                "<package> element without a <name>".to_string(),
            ));
        }
        package.name = package.name.trim().to_string();
        if let Some(arch) = package.arch.take() {
            package.arch = Some(arch.trim().to_string());
        }
        Ok(package)
    }
}

impl<R: BufRead> Iterator for PrimaryScanner<R> {
    type Item = InspectResult<PrimaryPackage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_package() {
            Ok(Some(package)) => Some(Ok(package)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Serialized XML of the first package named `name`. Stops reading at the
/// end of that element; later duplicates are never seen.
pub fn find_package<R: BufRead>(input: R, name: &str) -> InspectResult<Option<String>> {
    for package in PrimaryScanner::capturing(input) {
        let package = package?;
        if package.name == name {
            return package.to_xml().map(Some);
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const PRIMARY: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<metadata xmlns="http://linux.duke.edu/metadata/common" xmlns:rpm="http://linux.duke.edu/metadata/rpm" packages="3">
<package type="rpm">
  <name>curl</name>
  <arch>x86_64</arch>
  <version epoch="0" ver="7.1" rel="1"/>
  <summary>A utility for getting files from remote servers &amp; more</summary>
  <format>
    <rpm:license>MIT</rpm:license>
    <rpm:provides>
      <rpm:entry name="curl" flags="EQ" epoch="0" ver="7.1" rel="1"/>
    </rpm:provides>
  </format>
</package>
<package type="rpm">
  <name>wget</name>
  <arch>aarch64</arch>
  <version epoch="0" ver="1.21.4" rel="3.fc39"/>
</package>
<package type="rpm">
  <name>curl</name>
  <arch>src</arch>
  <version epoch="0" ver="8.0" rel="2"/>
</package>
</metadata>
"#;

    #[test]
    fn test_full_scan_records() {
        let records: Vec<String> = PrimaryScanner::new(Cursor::new(PRIMARY))
            .map(|p| p.unwrap().record().unwrap().to_string())
            .collect();
        assert_eq!(
            records,
            vec![
                "curl@7.1-1?arch=x86_64",
                "wget@1.21.4-3.fc39?arch=aarch64",
                "curl@8.0-2?arch=src",
            ]
        );
    }

    #[test]
    fn test_field_only_scan_keeps_no_events() {
        let package = PrimaryScanner::new(Cursor::new(PRIMARY)).next().unwrap().unwrap();
        assert_eq!(package.to_xml().unwrap(), "");
    }

    #[test]
    fn test_find_package_returns_first_match_only() {
        let xml = find_package(Cursor::new(PRIMARY), "curl").unwrap().unwrap();
        assert!(xml.starts_with(r#"<package type="rpm">"#));
        assert!(xml.ends_with("</package>"));
        assert!(xml.contains("<name>curl</name>"));
        assert!(xml.contains(r#"ver="7.1" rel="1""#));
        assert!(xml.contains("&amp; more"));
        assert!(xml.contains(r#"<rpm:entry name="curl""#));
        assert!(!xml.contains("wget"));
        assert!(!xml.contains("8.0"));
    }

    #[test]
    fn test_found_package_version() {
        let package = PrimaryScanner::capturing(Cursor::new(PRIMARY))
            .map(Result::unwrap)
            .find(|p| p.name == "curl")
            .unwrap();
        assert_eq!(package.version().unwrap(), "7.1-1");
    }

    #[test]
    fn test_find_package_not_found() {
        assert_eq!(find_package(Cursor::new(PRIMARY), "nginx").unwrap(), None);
        assert_eq!(find_package(Cursor::new(PRIMARY), "cur").unwrap(), None);
    }

    #[test]
    fn test_early_return_ignores_broken_tail() {
        let truncated = &PRIMARY[..PRIMARY.find("<name>wget").unwrap()];
        let xml = find_package(Cursor::new(truncated), "curl").unwrap().unwrap();
        assert!(xml.contains("<name>curl</name>"));
        assert!(find_package(Cursor::new(truncated), "wget").is_err());
    }

    #[test]
    fn test_package_without_name_is_malformed() {
        let doc = r#"<metadata><package type="rpm"><arch>noarch</arch></package></metadata>"#;
        let result = PrimaryScanner::new(Cursor::new(doc)).next().unwrap();
        assert!(matches!(result, Err(InspectError::MalformedIndex(_))));
    }

    #[test]
    fn test_missing_release_keeps_plain_version() {
        let doc = r#"<metadata><package><name>x</name><arch>noarch</arch><version ver="2"/></package></metadata>"#;
        let package = PrimaryScanner::new(Cursor::new(doc)).next().unwrap().unwrap();
        assert_eq!(package.record().unwrap().to_string(), "x@2?arch=noarch");
    }

    #[test]
    fn test_missing_arch_or_version_is_malformed() {
        let no_arch = r#"<metadata><package><name>x</name><version ver="2" rel="1"/></package></metadata>"#;
        let package = PrimaryScanner::new(Cursor::new(no_arch)).next().unwrap().unwrap();
        match package.record() {
            Err(InspectError::MalformedIndex(msg)) => assert!(msg.contains("no arch")),
            other => panic!("unexpected result: {:?}", other),
        }

        let no_version = r#"<metadata><package><name>y</name><arch>noarch</arch></package></metadata>"#;
        let package = PrimaryScanner::new(Cursor::new(no_version)).next().unwrap().unwrap();
        match package.record() {
            Err(InspectError::MalformedIndex(msg)) => assert!(msg.contains("no version")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_primary_location() {
        let repomd = r#"<?xml version="1.0" encoding="UTF-8"?>
<repomd xmlns="http://linux.duke.edu/metadata/repo" xmlns:rpm="http://linux.duke.edu/metadata/rpm">
  <revision>1681418230</revision>
  <data type="filelists">
    <location href="repodata/131f-filelists.xml.gz"/>
  </data>
  <data type="primary">
    <checksum type="sha256">f6dee453</checksum>
    <location href="repodata/f6de-primary.xml.gz"/>
    <size>18320782</size>
  </data>
  <data type="primary_db">
    <location href="repodata/60bf-primary.sqlite.xz"/>
  </data>
</repomd>
"#;
        assert_eq!(primary_location(repomd).unwrap(), "repodata/f6de-primary.xml.gz");
    }

    #[test]
    fn test_repomd_without_primary() {
        let repomd = r#"<repomd><data type="other"><location href="x"/></data></repomd>"#;
        assert!(matches!(
            primary_location(repomd),
            Err(InspectError::MalformedIndex(_))
        ));
    }
}
