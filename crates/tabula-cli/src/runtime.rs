// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use std::sync::mpsc::Sender;
use std::thread;
use tabula_app::{LoadTicket, QueryError, QueryRequest, QueryResponse, QueryTransport};
use tabula_client::Client;
use tabula_testkit::DemoBackend;
use tabula_tui::{AppRuntime, InternalEvent};

/// Where queries go: the admin API or the seeded in-memory backend.
pub enum Backend {
    Remote(Client),
    Demo(Box<DemoBackend>),
}

impl Backend {
    pub fn describe(&self) -> String {
        match self {
            Self::Remote(client) => format!("remote {}", client.base_url()),
            Self::Demo(_) => "demo data".to_owned(),
        }
    }
}

impl QueryTransport for Backend {
    fn query(
        &mut self,
        endpoint: &str,
        request: &QueryRequest,
    ) -> Result<QueryResponse, QueryError> {
        match self {
            Self::Remote(client) => client.run_query(endpoint, request),
            Self::Demo(backend) => backend.query(endpoint, request),
        }
    }
}

impl AppRuntime for Backend {
    fn query(
        &mut self,
        endpoint: &str,
        request: &QueryRequest,
    ) -> Result<QueryResponse, QueryError> {
        QueryTransport::query(self, endpoint, request)
    }

    fn spawn_query(&mut self, ticket: LoadTicket, tx: Sender<InternalEvent>) -> Result<()> {
        match self {
            Self::Remote(client) => {
                let client = client.clone();
                thread::Builder::new()
                    .name(format!("query-{}", ticket.resource.as_str()))
                    .spawn(move || {
                        let result = client.run_query(ticket.endpoint, &ticket.request);
                        if tx
                            .send(InternalEvent::QueryFinished { ticket, result })
                            .is_err()
                        {
                            tracing::debug!("query finished after the ui closed");
                        }
                    })
                    .map_err(|error| anyhow!("spawn query thread: {error}"))?;
                Ok(())
            }
            Self::Demo(backend) => {
                let result = backend.query(ticket.endpoint, &ticket.request);
                tx.send(InternalEvent::QueryFinished { ticket, result })
                    .map_err(|_| anyhow!("query event channel closed"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Backend;
    use anyhow::Result;
    use std::sync::mpsc;
    use std::time::{Duration, Instant};
    use tabula_app::{PanelOptions, ResourceKind, TabbedPanel};
    use tabula_client::Client;
    use tabula_testkit::{DEFAULT_SEED, DemoBackend};
    use tabula_tui::{AppRuntime, InternalEvent};

    fn first_ticket(resource: ResourceKind) -> tabula_app::LoadTicket {
        let t0 = Instant::now();
        let mut panel = TabbedPanel::new(&PanelOptions::default());
        panel.mount(resource, t0);
        panel
            .tick(t0 + Duration::from_millis(50))
            .into_iter()
            .next()
            .expect("initial tab should load")
    }

    #[test]
    fn demo_backend_reports_inline() -> Result<()> {
        let mut backend = Backend::Demo(Box::new(DemoBackend::seeded(DEFAULT_SEED)));
        let (tx, rx) = mpsc::channel();
        backend.spawn_query(first_ticket(ResourceKind::Roles), tx)?;

        let Ok(InternalEvent::QueryFinished { ticket, result }) = rx.try_recv() else {
            panic!("demo query should finish before spawn_query returns");
        };
        assert_eq!(ticket.resource, ResourceKind::Roles);
        assert_eq!(result.map(|page| page.pagination.total).ok(), Some(6));
        Ok(())
    }

    #[test]
    fn remote_backend_reports_from_worker_thread() -> Result<()> {
        let client = Client::new("http://127.0.0.1:1/api", Duration::from_millis(50))?;
        let mut backend = Backend::Remote(client);
        let (tx, rx) = mpsc::channel();
        backend.spawn_query(first_ticket(ResourceKind::Sessions), tx)?;

        let event = rx.recv_timeout(Duration::from_secs(5))?;
        let InternalEvent::QueryFinished { ticket, result } = event else {
            panic!("expected a query result, got {event:?}");
        };
        assert_eq!(ticket.endpoint, "sessions/query");
        assert!(matches!(result, Err(tabula_app::QueryError::Transport(_))));
        Ok(())
    }

    #[test]
    fn describe_names_the_backend() -> Result<()> {
        let client = Client::new("https://admin.example/api", Duration::from_secs(1))?;
        assert_eq!(
            Backend::Remote(client).describe(),
            "remote https://admin.example/api"
        );
        assert_eq!(Backend::Demo(Box::default()).describe(), "demo data");
        Ok(())
    }
}
