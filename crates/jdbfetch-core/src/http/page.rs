//! Plain GET of a landing page into memory.

use super::{HttpError, HttpOptions};

/// Upper bound on a landing page body kept in memory.
pub const MAX_PAGE_BYTES: usize = 8 * 1024 * 1024;

/// GETs `url` and returns the body as text (lossy UTF-8). Non-2xx is an error.
pub fn get_text(url: &str, opts: &HttpOptions) -> Result<String, HttpError> {
    let mut body: Vec<u8> = Vec::new();
    let mut too_large = false;

    let mut easy = opts.easy(url).map_err(HttpError::curl(url))?;
    {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                if body.len() + data.len() > MAX_PAGE_BYTES {
                    too_large = true;
                    return Ok(0);
                }
                body.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(HttpError::curl(url))?;
        let performed = transfer.perform();
        drop(transfer);
        if too_large {
            return Err(HttpError::BodyTooLarge {
                url: url.to_string(),
                limit: MAX_PAGE_BYTES,
            });
        }
        performed.map_err(HttpError::curl(url))?;
    }

    let code = easy.response_code().map_err(HttpError::curl(url))?;
    if !(200..300).contains(&code) {
        return Err(HttpError::Status {
            method: "GET",
            url: url.to_string(),
            code,
        });
    }

    Ok(String::from_utf8_lossy(&body).into_owned())
}
