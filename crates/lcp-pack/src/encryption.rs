//! # META-INF/encryption.xml
//!
//! EPUB reading systems learn which entries are encrypted, and where the
//! key is, from `META-INF/encryption.xml`. The pipeline writes one
//! `EncryptedData` element per encrypted resource, each pointing at the
//! content key inside the license.
//!
//! A package that already carries the file (obfuscated fonts, for example)
//! keeps its elements. New ones are inserted before the closing root tag,
//! and resources the file already lists are not encrypted again.
//!
//! Every inserted element declares its own namespaces, so it stays valid
//! whatever prefixes the existing document uses.

use crate::pipeline::EncryptedResource;

/// Path of the encryption document inside the package.
pub const ENCRYPTION_XML: &str = "META-INF/encryption.xml";

/// Present in every EPUB package.
pub const CONTAINER_XML: &str = "META-INF/container.xml";

const CONTENT_KEY_URI: &str = "license.lcpl#/encryption/content_key";
const CONTENT_KEY_TYPE: &str = "http://readium.org/2014/01/lcp#EncryptedContentKey";

/// Whether `document` already declares `path` as an encrypted resource.
pub fn lists_resource(document: &str, path: &str) -> bool {
    let uri = escape(path);
    document.contains(&format!("URI=\"{uri}\"")) || document.contains(&format!("URI='{uri}'"))
}

/// Render the encryption document for `resources`, extending `existing`
/// when the package had one.
///
/// Returns `None` when `existing` has no closing `encryption` element.
pub fn render(existing: Option<&str>, resources: &[EncryptedResource]) -> Option<String> {
    let elements: String = resources.iter().map(encrypted_data).collect();
    match existing {
        None => Some(format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <encryption xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n\
             {elements}</encryption>\n"
        )),
        Some(document) => {
            let at = document
                .rfind("</")
                .filter(|&i| document[i..].trim_end().ends_with("encryption>"))?;
            Some(format!("{}{elements}{}", &document[..at], &document[at..]))
        }
    }
}

fn encrypted_data(resource: &EncryptedResource) -> String {
    format!(
        r#"  <EncryptedData xmlns="http://www.w3.org/2001/04/xmlenc#">
    <EncryptionMethod Algorithm="{algorithm}"/>
    <KeyInfo xmlns="http://www.w3.org/2000/09/xmldsig#">
      <RetrievalMethod URI="{CONTENT_KEY_URI}" Type="{CONTENT_KEY_TYPE}"/>
    </KeyInfo>
    <CipherData>
      <CipherReference URI="{uri}"/>
    </CipherData>
    <EncryptionProperties>
      <EncryptionProperty>
        <Compression xmlns="http://www.idpf.org/2016/encryption#compression" Method="0" OriginalLength="{length}"/>
      </EncryptionProperty>
    </EncryptionProperties>
  </EncryptedData>
"#,
        algorithm = escape(resource.algorithm),
        uri = escape(&resource.path),
        length = resource.original_size,
    )
}

/// Escape text for use inside an XML attribute value.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource(path: &str, size: u64) -> EncryptedResource {
        EncryptedResource {
            path: path.to_string(),
            original_size: size,
            encrypted_size: size + 16,
            algorithm: "http://www.w3.org/2001/04/xmlenc#aes256-cbc",
        }
    }

    #[test]
    fn test_fresh_document() {
        let doc = render(None, &[resource("OEBPS/ch1.xhtml", 120)]).unwrap();
        assert!(doc.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<encryption "));
        assert!(doc.ends_with("</encryption>\n"));
        assert!(doc.contains(r#"<CipherReference URI="OEBPS/ch1.xhtml"/>"#));
        assert!(doc.contains(r#"Algorithm="http://www.w3.org/2001/04/xmlenc#aes256-cbc""#));
        assert!(doc.contains(r#"URI="license.lcpl#/encryption/content_key""#));
        assert!(doc.contains(r#"Method="0" OriginalLength="120""#));
        assert_eq!(doc.matches("<EncryptedData ").count(), 1);
    }

    #[test]
    fn test_extends_existing_document() {
        let existing = "<?xml version=\"1.0\"?>\n\
            <enc:encryption xmlns:enc=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n\
            <EncryptedData><CipherData><CipherReference URI=\"fonts/a.otf\"/></CipherData>\
            </EncryptedData>\n</enc:encryption>\n";
        let doc = render(Some(existing), &[resource("ch1.xhtml", 5)]).unwrap();
        assert!(doc.contains("URI=\"fonts/a.otf\""));
        let new_at = doc.find("URI=\"ch1.xhtml\"").unwrap();
        let close_at = doc.find("</enc:encryption>").unwrap();
        assert!(new_at < close_at);
        assert!(doc.ends_with("</enc:encryption>\n"));
    }

    #[test]
    fn test_existing_without_root_close_rejected() {
        assert!(render(Some("<encryption>"), &[]).is_none());
        assert!(render(Some("<other></other>"), &[]).is_none());
    }

    #[test]
    fn test_paths_are_escaped() {
        let doc = render(None, &[resource("a&b/\"q\".xhtml", 1)]).unwrap();
        assert!(doc.contains(r#"URI="a&amp;b/&quot;q&quot;.xhtml""#));
        assert!(lists_resource(&doc, "a&b/\"q\".xhtml"));
    }

    #[test]
    fn test_lists_resource_either_quote() {
        assert!(lists_resource(r#"<CipherReference URI="f.otf"/>"#, "f.otf"));
        assert!(lists_resource("<CipherReference URI='f.otf'/>", "f.otf"));
        assert!(!lists_resource(r#"<CipherReference URI="f.otf"/>"#, "g.otf"));
    }
}
