use axum::extract::Multipart;
use ratecon_core::SourceDocument;
use ratecon_core::document::OCTET_STREAM;

/// Name of the multipart field carrying the PDF.
pub const FILE_FIELD: &str = "file";

/// Pull the single `file` field out of a multipart upload.
///
/// The part's declared content type is kept as the document's media type.
/// When the client declared nothing useful (`application/octet-stream` or no
/// header at all) the type is sniffed from the bytes instead.
pub async fn parse_multipart(mut multipart: Multipart) -> Result<SourceDocument, String> {
    let mut document = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| format!("Failed to read form field: {}", e))?
    {
        if field.name() != Some(FILE_FIELD) {
            // Unknown fields are drained so a broken body still surfaces.
            let name = field.name().unwrap_or_default().to_string();
            field
                .bytes()
                .await
                .map_err(|e| format!("Failed to read form field '{}': {}", name, e))?;
            continue;
        }
        if document.is_some() {
            return Err(format!("Multiple '{}' fields", FILE_FIELD));
        }

        let filename = field.file_name().map(str::to_string);
        let declared = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| format!("Failed to read file data: {}", e))?
            .to_vec();

        let doc = match declared {
            Some(media_type) if !media_type.eq_ignore_ascii_case(OCTET_STREAM) => {
                let doc = SourceDocument::new(data, media_type);
                match filename {
                    Some(name) => doc.with_filename(name),
                    None => doc,
                }
            }
            _ => SourceDocument::sniffed(data, filename),
        };
        document = Some(doc);
    }

    document.ok_or_else(|| format!("Missing form field '{}'", FILE_FIELD))
}
