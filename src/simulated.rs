//! A media driver that simulates network sources on tokio timers.
//!
//! Sources on configured hosts never load; everything else loads after a
//! fixed latency and plays a clip of fixed length, reporting its position on
//! every tick.

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use url::Url;

use crate::{
    config::Simulation,
    driver::{EventSender, MediaDriver, MediaEvent, Ticket},
    state::Failure,
};

#[derive(Debug, Default)]
struct Media {
    ticket: Ticket,
    available: bool,
    playing: bool,
    position: Duration,
    // Bumped on every play and pause, so a superseded ticker stops.
    generation: u64,
}

pub struct SimulatedDriver {
    events: EventSender,
    unreachable_hosts: HashSet<String>,
    load_latency: Duration,
    media_length: Duration,
    tick: Duration,
    autoplay: bool,
    gesture: bool,
    volume: f32,
    media: Arc<Mutex<Media>>,
}

impl SimulatedDriver {
    #[must_use]
    pub fn new(simulation: &Simulation, events: EventSender) -> Self {
        Self {
            events,
            unreachable_hosts: simulation.unreachable_hosts.iter().cloned().collect(),
            load_latency: simulation.load_latency(),
            media_length: simulation.media_length(),
            tick: simulation.tick(),
            autoplay: simulation.autoplay,
            gesture: false,
            volume: 1.0,
            media: Arc::new(Mutex::new(Media::default())),
        }
    }

    #[must_use]
    pub fn volume(&self) -> f32 {
        self.volume
    }

    fn send(&self, ticket: Ticket, event: MediaEvent) {
        if self.events.send((ticket, event)).is_err() {
            trace!("player went away, dropping {event:?}");
        }
    }

    fn is_reachable(&self, url: &Url) -> bool {
        url.host_str()
            .is_some_and(|host| !self.unreachable_hosts.contains(host))
    }
}

impl MediaDriver for SimulatedDriver {
    fn load(&mut self, ticket: Ticket, url: &Url) {
        let available = self.is_reachable(url);
        trace!("simulating load {ticket} of {url} (available: {available})");

        {
            let mut media = self.media.lock().unwrap_or_else(PoisonError::into_inner);
            *media = Media {
                ticket,
                available,
                generation: media.generation + 1,
                ..Media::default()
            };
        }

        let events = self.events.clone();
        let latency = self.load_latency;
        tokio::spawn(async move {
            tokio::time::sleep(latency).await;
            let event = if available {
                MediaEvent::Ready
            } else {
                MediaEvent::Failed(Failure::SourceUnavailable)
            };
            if events.send((ticket, event)).is_err() {
                trace!("player went away, dropping {event:?}");
            }
        });
    }

    fn play(&mut self, ticket: Ticket) {
        if !self.autoplay && !self.gesture {
            debug!("simulated host rejects playback without a user gesture");
            self.send(ticket, MediaEvent::Failed(Failure::PlaybackRejected));
            return;
        }

        let generation = {
            let mut media = self.media.lock().unwrap_or_else(PoisonError::into_inner);
            if media.ticket != ticket {
                trace!("ignoring play for superseded load {ticket}");
                return;
            }
            if !media.available {
                drop(media);
                self.send(ticket, MediaEvent::Failed(Failure::SourceUnavailable));
                return;
            }
            if media.playing {
                return;
            }

            media.playing = true;
            media.generation += 1;
            media.generation
        };

        self.send(ticket, MediaEvent::Started);

        let events = self.events.clone();
        let media = Arc::clone(&self.media);
        let tick = self.tick;
        let length = self.media_length;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + tick, tick);
            loop {
                interval.tick().await;

                let (position, ended) = {
                    let mut media = media.lock().unwrap_or_else(PoisonError::into_inner);
                    if media.generation != generation || !media.playing {
                        break;
                    }

                    media.position = (media.position + tick).min(length);
                    let ended = media.position >= length;
                    if ended {
                        media.playing = false;
                    }
                    (media.position, ended)
                };

                if events.send((ticket, MediaEvent::TimeUpdate(position))).is_err() {
                    trace!("player went away, stopping playback of {ticket}");
                    break;
                }
                if ended {
                    if events.send((ticket, MediaEvent::Ended)).is_err() {
                        trace!("player went away, dropping end of {ticket}");
                    }
                    break;
                }
            }
        });
    }

    fn pause(&mut self) {
        let mut media = self.media.lock().unwrap_or_else(PoisonError::into_inner);
        media.playing = false;
        media.generation += 1;
    }

    fn seek(&mut self, position: Duration) {
        let mut media = self.media.lock().unwrap_or_else(PoisonError::into_inner);
        media.position = position.min(self.media_length);
    }

    fn set_volume(&mut self, volume: f32) {
        trace!("simulated volume {volume:.2}");
        self.volume = volume;
    }

    fn user_gesture(&mut self) {
        self.gesture = true;
    }

    fn probe_autoplay(&mut self) {
        self.send(Ticket::NONE, MediaEvent::AutoplayProbed(self.autoplay));
    }
}
