use rand::seq::SliceRandom;
use std::collections::VecDeque;
use tracing::{debug, info};

use super::track::Track;
use crate::error::{MusicError, Result};

pub const DEFAULT_MAX_SIZE: usize = 100;
pub const DEFAULT_HISTORY_SIZE: usize = 10;

/// Cola FIFO de una guild con historial acotado y modos de repetición.
///
/// `loop_track` y `loop_queue` son mutuamente excluyentes: activar uno
/// desactiva el otro. La repetición de pista la resuelve la sesión sin
/// consultar la cola; la repetición de cola ocurre dentro de [`MusicQueue::get_next`].
#[derive(Debug)]
pub struct MusicQueue {
    items: VecDeque<Track>,
    history: VecDeque<Track>,
    loop_track: bool,
    loop_queue: bool,
    max_size: usize,
    max_history: usize,
}

impl Default for MusicQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SIZE, DEFAULT_HISTORY_SIZE)
    }
}

impl MusicQueue {
    pub fn new(max_size: usize, max_history: usize) -> Self {
        Self {
            items: VecDeque::new(),
            history: VecDeque::with_capacity(max_history),
            loop_track: false,
            loop_queue: false,
            max_size,
            max_history,
        }
    }

    /// Agrega un track al final y devuelve su posición (base 0)
    pub fn add(&mut self, track: Track) -> Result<usize> {
        if self.items.len() >= self.max_size {
            return Err(MusicError::QueueFull { max: self.max_size });
        }

        info!("➕ Agregado a la cola: {}", track.title());
        self.items.push_back(track);

        Ok(self.items.len() - 1)
    }

    /// Agrega un track al frente, sin comprobar el tamaño máximo
    pub fn add_next(&mut self, track: Track) {
        info!("⏫ Agregado como siguiente: {}", track.title());
        self.items.push_front(track);
    }

    /// Saca el siguiente track (FIFO) y lo guarda en el historial
    pub fn get_next(&mut self) -> Option<Track> {
        let track = self.items.pop_front()?;
        self.push_history(track.clone());

        if self.loop_queue {
            self.items.push_back(track.clone());
            debug!("🔁 Track reencolado por loop de cola: {}", track.title());
        }

        Some(track)
    }

    pub fn peek(&self) -> Option<&Track> {
        self.items.front()
    }

    /// Elimina el track en `index`
    pub fn remove(&mut self, index: usize) -> Result<Track> {
        let len = self.items.len();
        let track = self
            .items
            .remove(index)
            .ok_or(MusicError::IndexOutOfRange { index, len })?;

        debug!("❌ Track eliminado en posición {}", index);
        Ok(track)
    }

    /// Vacía la cola; historial y modos de repetición no cambian
    pub fn clear(&mut self) {
        self.items.clear();
        info!("🗑️ Cola limpiada");
    }

    /// Mezcla el orden restante (Fisher-Yates)
    pub fn shuffle(&mut self) {
        let mut rng = rand::thread_rng();
        self.items.make_contiguous().shuffle(&mut rng);
        info!("🔀 Cola mezclada ({} canciones)", self.items.len());
    }

    /// Mueve un track a una nueva posición
    pub fn move_track(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.items.len();
        if from >= len {
            return Err(MusicError::IndexOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(MusicError::IndexOutOfRange { index: to, len });
        }

        if from != to {
            if let Some(track) = self.items.remove(from) {
                self.items.insert(to, track);
            }
            debug!("📍 Track movido de posición {} a {}", from, to);
        }

        Ok(())
    }

    /// Suma de duraciones en cola (sin contar la pista actual), en segundos
    pub fn total_duration(&self) -> u64 {
        self.items.iter().map(Track::duration).sum()
    }

    pub fn get(&self, index: usize) -> Result<&Track> {
        self.items.get(index).ok_or(MusicError::IndexOutOfRange {
            index,
            len: self.items.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn iter(&self) -> impl Iterator<Item = &Track> {
        self.items.iter()
    }

    pub fn tracks(&self) -> Vec<Track> {
        self.items.iter().cloned().collect()
    }

    /// Pistas reproducidas recientemente, de la más antigua a la más nueva
    pub fn history(&self) -> Vec<Track> {
        self.history.iter().cloned().collect()
    }

    pub fn is_loop(&self) -> bool {
        self.loop_track
    }

    pub fn set_loop(&mut self, enabled: bool) {
        self.loop_track = enabled;
        if enabled {
            self.loop_queue = false;
            info!("🔂 Repetir canción activado");
        } else {
            info!("➡️ Repetir canción desactivado");
        }
    }

    pub fn is_loop_queue(&self) -> bool {
        self.loop_queue
    }

    pub fn set_loop_queue(&mut self, enabled: bool) {
        self.loop_queue = enabled;
        if enabled {
            self.loop_track = false;
            info!("🔁 Repetir cola activado");
        } else {
            info!("➡️ Repetir cola desactivado");
        }
    }

    /// Obtiene una página de la cola (páginas base 1)
    pub fn page(&self, page: usize, items_per_page: usize) -> QueuePage {
        let items_per_page = items_per_page.max(1);
        let total_items = self.items.len();
        let total_pages = total_items.div_ceil(items_per_page).max(1);
        let current_page = page.clamp(1, total_pages);
        let start = (current_page - 1) * items_per_page;

        QueuePage {
            items: self
                .items
                .iter()
                .skip(start)
                .take(items_per_page)
                .cloned()
                .collect(),
            current_page,
            total_pages,
            total_items,
        }
    }

    fn push_history(&mut self, track: Track) {
        if self.max_history == 0 {
            return;
        }
        if self.history.len() >= self.max_history {
            self.history.pop_front();
        }
        self.history.push_back(track);
    }
}

#[derive(Debug, Clone)]
pub struct QueuePage {
    pub items: Vec<Track>,
    pub current_page: usize,
    pub total_pages: usize,
    pub total_items: usize,
}
