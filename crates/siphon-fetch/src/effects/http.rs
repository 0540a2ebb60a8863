#[cfg(feature = "reqwest")]
mod reqwest_impl {
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::time::Duration;

    use bytes::Bytes;
    use futures_util::{Stream, StreamExt};
    use reqwest::header::CONTENT_TYPE;
    use reqwest::redirect::Policy;
    use url::Url;

    use crate::data::RequestOptions;
    use crate::effects::transport::{Perform, TransferHandler, Transport};
    use crate::error::TransportError;

    type PendingResponse = Pin<Box<dyn Future<Output = reqwest::Result<reqwest::Response>> + Send>>;
    type BodyStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

    enum Transfer {
        Detached,
        Requesting(PendingResponse),
        Receiving(BodyStream),
        Finished,
    }

    enum Event {
        Header(String),
        Body(Bytes),
        Failed(reqwest::Error),
    }

    enum Activity {
        Idle,
        Head(reqwest::Response),
        Chunk(Bytes),
        End,
        Failed(reqwest::Error),
    }

    /// Production transport built on `reqwest`.
    ///
    /// `wait` is where network I/O happens: it waits (bounded) for the response
    /// head or the next body chunk and queues what arrived. `perform` hands one
    /// queued event to the handler per call and reports
    /// [`Perform::Again`] while more are queued. Response heads are rendered as
    /// raw lines (`HTTP/1.1 200 OK`, `content-type: text/plain`, blank line).
    ///
    /// Redirects are followed inside `reqwest`, so only the final response head
    /// is ever reported.
    pub struct ReqwestTransport {
        client:       Option<reqwest::Client>,
        url:          Option<Url>,
        transfer:     Transfer,
        events:       VecDeque<Event>,
        status:       Option<u16>,
        content_type: Option<String>,
    }

    impl Default for ReqwestTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl ReqwestTransport {
        pub fn new() -> Self {
            Self {
                client:       None,
                url:          None,
                transfer:     Transfer::Detached,
                events:       VecDeque::new(),
                status:       None,
                content_type: None,
            }
        }

        fn transfers_left(&self) -> usize {
            match self.transfer {
                Transfer::Finished if self.events.is_empty() => 0,
                Transfer::Detached => 0,
                _ => 1,
            }
        }

        fn abort(&mut self, reason: &'static str) {
            tracing::debug!(reason, "transfer aborted by handler");
            self.transfer = Transfer::Finished;
            self.events.clear();
        }

        fn accept_head(&mut self, response: reqwest::Response) {
            let status = response.status();
            self.status = Some(status.as_u16());
            self.content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned());

            self.events.push_back(Event::Header(format!(
                "{:?} {} {}\r\n",
                response.version(),
                status.as_u16(),
                status.canonical_reason().unwrap_or_default()
            )));
            for (name, value) in response.headers() {
                self.events.push_back(Event::Header(format!(
                    "{}: {}\r\n",
                    name.as_str(),
                    String::from_utf8_lossy(value.as_bytes())
                )));
            }
            self.events.push_back(Event::Header("\r\n".to_string()));

            self.transfer = Transfer::Receiving(Box::pin(response.bytes_stream()));
        }
    }

    impl Transport for ReqwestTransport {
        type Error = TransportError;

        fn configure(&mut self, options: &RequestOptions) -> Result<(), TransportError> {
            let url = Url::parse(&options.url)?;
            let redirect = if options.follow_redirects {
                Policy::limited(options.max_redirects)
            } else {
                Policy::none()
            };

            let client = reqwest::Client::builder()
                .redirect(redirect)
                .cookie_store(options.cookies)
                .referer(options.auto_referer)
                .connect_timeout(options.connect_timeout)
                .user_agent(options.user_agent.as_str())
                .build()?;

            self.client = Some(client);
            self.url = Some(url);
            Ok(())
        }

        fn attach(&mut self) -> Result<(), TransportError> {
            if !matches!(self.transfer, Transfer::Detached) {
                return Err(TransportError::AlreadyAttached);
            }
            let (Some(client), Some(url)) = (&self.client, &self.url) else {
                return Err(TransportError::NotConfigured);
            };

            let pending = client.get(url.clone()).send();
            self.transfer = Transfer::Requesting(Box::pin(pending));
            Ok(())
        }

        async fn perform<H: TransferHandler>(
            &mut self,
            handler: &mut H,
        ) -> Result<Perform, TransportError> {
            if matches!(self.transfer, Transfer::Detached) {
                return Err(TransportError::NotAttached);
            }

            match self.events.pop_front() {
                Some(Event::Header(line)) => {
                    if handler.on_header(line.as_bytes()) != line.len() {
                        self.abort("header rejected");
                    }
                }
                Some(Event::Body(chunk)) => {
                    if handler.on_body(&chunk).await != chunk.len() {
                        self.abort("short body write");
                    }
                }
                Some(Event::Failed(e)) => {
                    tracing::warn!(error = %e, "transfer failed");
                }
                None => {}
            }

            if self.events.is_empty() {
                Ok(Perform::Running(self.transfers_left()))
            } else {
                Ok(Perform::Again)
            }
        }

        async fn wait(&mut self, timeout: Duration) -> Result<usize, TransportError> {
            if !self.events.is_empty() {
                return Ok(self.events.len());
            }

            // The pending request and the body stream live in `self.transfer`,
            // so a timeout here never loses progress.
            let activity = match &mut self.transfer {
                Transfer::Detached => return Err(TransportError::NotAttached),
                Transfer::Finished => return Ok(0),
                Transfer::Requesting(pending) => {
                    match tokio::time::timeout(timeout, pending.as_mut()).await {
                        Err(_) => Activity::Idle,
                        Ok(Ok(response)) => Activity::Head(response),
                        Ok(Err(e)) => Activity::Failed(e),
                    }
                }
                Transfer::Receiving(body) => match tokio::time::timeout(timeout, body.next()).await {
                    Err(_) => Activity::Idle,
                    Ok(Some(Ok(chunk))) => Activity::Chunk(chunk),
                    Ok(Some(Err(e))) => Activity::Failed(e),
                    Ok(None) => Activity::End,
                },
            };

            match activity {
                Activity::Idle => {}
                Activity::Head(response) => self.accept_head(response),
                Activity::Chunk(chunk) => self.events.push_back(Event::Body(chunk)),
                Activity::End => self.transfer = Transfer::Finished,
                Activity::Failed(e) => {
                    self.transfer = Transfer::Finished;
                    self.events.push_back(Event::Failed(e));
                }
            }
            Ok(self.events.len())
        }

        fn response_code(&self) -> Option<u16> {
            self.status
        }

        fn content_type(&self) -> Option<String> {
            self.content_type.clone()
        }

        fn detach(&mut self) {
            self.transfer = Transfer::Detached;
            self.events.clear();
        }
    }

}

#[cfg(feature = "reqwest")]
pub use reqwest_impl::ReqwestTransport;
