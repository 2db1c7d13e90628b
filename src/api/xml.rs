//! S3 XML response builders.
//!
//! Hand-built strings rather than a serializer: the shapes are small,
//! fixed, and namespaced with the configured `s3Version`, which a derived
//! serializer would make awkward to thread through.

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn xmlns(s3_version: &str) -> String {
    format!("http://s3.amazonaws.com/doc/{s3_version}/")
}

/// Collapses the inter-tag whitespace the builders below carry for source
/// readability, producing the compact single-line form S3 itself returns.
/// Used when `Config::pretty_print` is `false` (the default); left alone
/// otherwise.
pub fn compact(xml: &str) -> String {
    let mut out = String::with_capacity(xml.len());
    let mut chars = xml.chars().peekable();
    while let Some(c) = chars.next() {
        out.push(c);
        if c == '>' {
            while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
                chars.next();
            }
        }
    }
    out
}

pub struct BucketEntry {
    pub name: String,
    pub creation_date: String,
}

pub fn list_all_my_buckets_result(owner: &str, buckets: &[BucketEntry], s3_version: &str) -> String {
    let mut body = String::new();
    for b in buckets {
        body.push_str(&format!(
            "<Bucket><Name>{}</Name><CreationDate>{}</CreationDate></Bucket>",
            escape_xml(&b.name),
            b.creation_date
        ));
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListAllMyBucketsResult xmlns="{xmlns}">
    <Owner><ID>{owner}</ID><DisplayName>{owner}</DisplayName></Owner>
    <Buckets>{body}</Buckets>
</ListAllMyBucketsResult>"#,
        xmlns = xmlns(s3_version),
        owner = escape_xml(owner),
        body = body
    )
}

pub struct ObjectEntry {
    pub key: String,
    pub last_modified: String,
    pub size: u64,
    pub storage_class: String,
}

pub struct ListBucketResultArgs<'a> {
    pub bucket: &'a str,
    pub prefix: &'a str,
    pub marker: &'a str,
    pub max_keys: u64,
    pub is_truncated: bool,
    pub owner: &'a str,
    pub objects: &'a [ObjectEntry],
    pub common_prefixes: &'a [String],
    pub s3_version: &'a str,
}

pub fn list_bucket_result(args: ListBucketResultArgs) -> String {
    let mut contents = String::new();
    for obj in args.objects {
        contents.push_str(&format!(
            "<Contents><Key>{}</Key><LastModified>{}</LastModified><ETag></ETag><Size>{}</Size>\
             <StorageClass>{}</StorageClass><Owner><ID>{}</ID><DisplayName>{}</DisplayName></Owner></Contents>",
            escape_xml(&obj.key),
            obj.last_modified,
            obj.size,
            escape_xml(&obj.storage_class),
            escape_xml(args.owner),
            escape_xml(args.owner),
        ));
    }

    let mut common_prefixes = String::new();
    for prefix in args.common_prefixes {
        common_prefixes.push_str(&format!(
            "<CommonPrefixes><Prefix>{}/</Prefix></CommonPrefixes>",
            escape_xml(prefix)
        ));
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="{xmlns}">
    <Name>{bucket}</Name>
    <Prefix>{prefix}</Prefix>
    <Marker>{marker}</Marker>
    <MaxKeys>{max_keys}</MaxKeys>
    <Delimiter>/</Delimiter>
    <IsTruncated>{is_truncated}</IsTruncated>
    {contents}
    {common_prefixes}
</ListBucketResult>"#,
        xmlns = xmlns(args.s3_version),
        bucket = escape_xml(args.bucket),
        prefix = escape_xml(args.prefix),
        marker = escape_xml(args.marker),
        max_keys = args.max_keys,
        is_truncated = args.is_truncated,
        contents = contents,
        common_prefixes = common_prefixes,
    )
}

pub fn copy_object_result(etag_hex: &str, last_modified: &str, s3_version: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<CopyObjectResult xmlns="{xmlns}">
    <LastModified>{last_modified}</LastModified>
    <ETag>&quot;{etag}&quot;</ETag>
</CopyObjectResult>"#,
        xmlns = xmlns(s3_version),
        last_modified = last_modified,
        etag = etag_hex,
    )
}

pub fn access_control_policy(owner: &str, s3_version: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<AccessControlPolicy xmlns="{xmlns}">
    <Owner><ID>{owner}</ID><DisplayName>{owner}</DisplayName></Owner>
    <AccessControlList>
        <Grant>
            <Grantee xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:type="CanonicalUser">
                <ID>{owner}</ID>
                <DisplayName>{owner}</DisplayName>
            </Grantee>
            <Permission>FULL_CONTROL</Permission>
        </Grant>
    </AccessControlList>
</AccessControlPolicy>"#,
        xmlns = xmlns(s3_version),
        owner = escape_xml(owner),
    )
}

pub fn list_multipart_uploads_result(bucket: &str, s3_version: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListMultipartUploadsResult xmlns="{xmlns}">
    <Bucket>{bucket}</Bucket>
    <IsTruncated>false</IsTruncated>
    <MaxUploads>1000</MaxUploads>
</ListMultipartUploadsResult>"#,
        xmlns = xmlns(s3_version),
        bucket = escape_xml(bucket),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_xml_handles_special_chars() {
        assert_eq!(escape_xml("a&b<c>\"d'"), "a&amp;b&lt;c&gt;&quot;d&apos;");
    }

    #[test]
    fn list_all_my_buckets_result_includes_each_bucket() {
        let buckets = vec![BucketEntry {
            name: "b1".to_string(),
            creation_date: "2024-01-01T00:00:00.000Z".to_string(),
        }];
        let xml = list_all_my_buckets_result("gateway", &buckets, "2006-03-01");
        assert!(xml.contains("<Name>b1</Name>"));
        assert!(xml.contains("http://s3.amazonaws.com/doc/2006-03-01/"));
    }

    #[test]
    fn list_bucket_result_emits_contents_and_common_prefixes() {
        let objects = vec![ObjectEntry {
            key: "a/x".to_string(),
            last_modified: "2024-01-01T00:00:00.000Z".to_string(),
            size: 5,
            storage_class: "STANDARD".to_string(),
        }];
        let prefixes = vec!["a/sub".to_string()];
        let xml = list_bucket_result(ListBucketResultArgs {
            bucket: "b1",
            prefix: "a/",
            marker: "",
            max_keys: 1000,
            is_truncated: false,
            owner: "gateway",
            objects: &objects,
            common_prefixes: &prefixes,
            s3_version: "2006-03-01",
        });
        assert!(xml.contains("<Key>a/x</Key>"));
        assert!(xml.contains("<Prefix>a/sub/</Prefix>"));
    }

    #[test]
    fn list_multipart_uploads_result_is_empty() {
        let xml = list_multipart_uploads_result("b1", "2006-03-01");
        assert!(xml.contains("<IsTruncated>false</IsTruncated>"));
        assert!(xml.contains("<MaxUploads>1000</MaxUploads>"));
    }

    #[test]
    fn compact_collapses_inter_tag_whitespace_only() {
        let pretty = "<a>\n    <b>value with spaces</b>\n    <c></c>\n</a>";
        assert_eq!(compact(pretty), "<a><b>value with spaces</b><c></c></a>");
    }
}
