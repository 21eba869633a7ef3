use quick_xml::Reader;
use quick_xml::events::Event;

/// Extract the text of the first `Message` element from an object store
/// error body
///
/// Returns `None` when the body is not XML or carries no message.
pub fn error_message(body: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut in_message = false;
    let mut message = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) if e.local_name().as_ref() == b"Message" => {
                in_message = true;
            }
            Ok(Event::Text(ref e)) if in_message => {
                message.push_str(&e.unescape().ok()?);
            }
            Ok(Event::CData(ref e)) if in_message => {
                message.push_str(&String::from_utf8_lossy(e));
            }
            Ok(Event::End(ref e)) if in_message && e.local_name().as_ref() == b"Message" => {
                break;
            }
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
    }

    let message = message.trim();
    if message.is_empty() {
        None
    } else {
        Some(message.to_string())
    }
}
