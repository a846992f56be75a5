use std::collections::{HashMap, VecDeque};

use crate::core::event::WindowId;
use crate::window::client::Client;

/// Which part of a client a display handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Client,
    Frame,
    Titlebar,
    Resize(usize),
    Button(usize),
}

/// Ordered set of managed clients with a reverse index over every handle they own.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    /// Most recently attached first
    order: VecDeque<WindowId>,
    clients: HashMap<WindowId, Client>,
    handles: HashMap<WindowId, (WindowId, HandleKind)>,
    selected: Option<WindowId>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn owned_handles(client: &Client) -> Vec<(WindowId, HandleKind)> {
        let frame = &client.frame;
        let mut handles = vec![(client.window, HandleKind::Client), (frame.frame, HandleKind::Frame)];
        handles.extend(frame.titlebar.map(|t| (t, HandleKind::Titlebar)));
        handles.extend(frame.resize.iter().enumerate().map(|(i, w)| (*w, HandleKind::Resize(i))));
        handles.extend(frame.buttons.iter().enumerate().map(|(i, w)| (*w, HandleKind::Button(i))));
        handles
    }

    /// Insert at the head. Returns false if the window is already managed.
    pub fn attach(&mut self, client: Client) -> bool {
        let window = client.window;
        if self.clients.contains_key(&window) {
            return false;
        }
        for (handle, kind) in Self::owned_handles(&client) {
            self.handles.insert(handle, (window, kind));
        }
        self.order.push_front(window);
        self.clients.insert(window, client);
        true
    }

    /// Remove a client and every handle it owns.
    pub fn detach(&mut self, window: WindowId) -> Option<Client> {
        let client = self.clients.remove(&window)?;
        for (handle, _) in Self::owned_handles(&client) {
            self.handles.remove(&handle);
        }
        self.order.retain(|w| *w != window);
        if self.selected == Some(window) {
            self.selected = self.order.front().copied();
        }
        Some(client)
    }

    pub fn select(&mut self, window: Option<WindowId>) {
        self.selected = window.filter(|w| self.clients.contains_key(w));
    }

    pub fn selected(&self) -> Option<WindowId> {
        self.selected
    }

    pub fn selected_client(&self) -> Option<&Client> {
        self.selected.and_then(|w| self.clients.get(&w))
    }

    pub fn get(&self, window: WindowId) -> Option<&Client> {
        self.clients.get(&window)
    }

    pub fn get_mut(&mut self, window: WindowId) -> Option<&mut Client> {
        self.clients.get_mut(&window)
    }

    pub fn contains(&self, window: WindowId) -> bool {
        self.clients.contains_key(&window)
    }

    /// Resolve any owned handle (client, frame, title bar, resize handle, button).
    pub fn lookup(&self, handle: WindowId) -> Option<(WindowId, HandleKind)> {
        self.handles.get(&handle).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Clients in registry order.
    pub fn iter(&self) -> impl Iterator<Item = &Client> {
        self.order.iter().filter_map(|w| self.clients.get(w))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Client> {
        self.clients.values_mut()
    }

    pub fn windows(&self) -> Vec<WindowId> {
        self.order.iter().copied().collect()
    }

    /// The tiled subsequence of (`screen`, `tag`), oldest first so the
    /// earliest client keeps the master slot.
    pub fn tiled_on(&self, screen: usize, tag: usize) -> Vec<WindowId> {
        self.order
            .iter()
            .rev()
            .filter(|w| self.clients.get(*w).is_some_and(|c| c.is_tiled_on(screen, tag)))
            .copied()
            .collect()
    }

    /// First client in order satisfying `pred`.
    pub fn first(&self, pred: impl Fn(&Client) -> bool) -> Option<WindowId> {
        self.iter().find(|c| pred(c)).map(|c| c.window)
    }

    /// Next client after `from` (wrapping) satisfying `pred`; `from` itself is never returned.
    pub fn next_matching(&self, from: WindowId, pred: impl Fn(&Client) -> bool) -> Option<WindowId> {
        let start = self.order.iter().position(|w| *w == from)?;
        let len = self.order.len();
        (1..len)
            .map(|offset| self.order[(start + offset) % len])
            .find(|w| self.clients.get(w).is_some_and(&pred))
    }

    pub fn prev_matching(&self, from: WindowId, pred: impl Fn(&Client) -> bool) -> Option<WindowId> {
        let start = self.order.iter().position(|w| *w == from)?;
        let len = self.order.len();
        (1..len)
            .map(|offset| self.order[(start + len - offset) % len])
            .find(|w| self.clients.get(w).is_some_and(&pred))
    }

    /// Exchange the order positions of two clients.
    pub fn swap(&mut self, a: WindowId, b: WindowId) -> bool {
        let pa = self.order.iter().position(|w| *w == a);
        let pb = self.order.iter().position(|w| *w == b);
        match (pa, pb) {
            (Some(pa), Some(pb)) => {
                self.order.swap(pa, pb);
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::window::frame::FrameWindows;

    fn client(window: WindowId) -> Client {
        let frame = FrameWindows {
            frame: window + 100,
            titlebar: Some(window + 200),
            resize: vec![window + 300, window + 301],
            buttons: vec![window + 400],
        };
        Client::new(window, frame, Rect::new(0, 0, 100, 100))
    }

    #[test]
    fn test_attach_inserts_at_head() {
        let mut reg = ClientRegistry::new();
        assert!(reg.attach(client(1)));
        assert!(reg.attach(client(2)));
        assert!(!reg.attach(client(1)));
        assert_eq!(reg.windows(), vec![2, 1]);
    }

    #[test]
    fn test_every_handle_resolves() {
        let mut reg = ClientRegistry::new();
        reg.attach(client(1));
        assert_eq!(reg.lookup(1), Some((1, HandleKind::Client)));
        assert_eq!(reg.lookup(101), Some((1, HandleKind::Frame)));
        assert_eq!(reg.lookup(201), Some((1, HandleKind::Titlebar)));
        assert_eq!(reg.lookup(302), Some((1, HandleKind::Resize(1))));
        assert_eq!(reg.lookup(401), Some((1, HandleKind::Button(0))));
        assert_eq!(reg.lookup(999), None);
    }

    #[test]
    fn test_detach_clears_handles_and_selection() {
        let mut reg = ClientRegistry::new();
        reg.attach(client(1));
        reg.attach(client(2));
        reg.attach(client(3));
        reg.select(Some(2));

        let detached = reg.detach(2).unwrap();
        assert_eq!(detached.window, 2);
        assert_eq!(reg.windows(), vec![3, 1]);
        assert_eq!(reg.selected(), Some(3));
        for handle in [2, 102, 202, 302, 303, 402] {
            assert_eq!(reg.lookup(handle), None);
        }
        assert!(reg.detach(2).is_none());
    }

    #[test]
    fn test_select_unknown_is_none() {
        let mut reg = ClientRegistry::new();
        reg.select(Some(7));
        assert_eq!(reg.selected(), None);
    }

    #[test]
    fn test_next_and_prev_wrap() {
        let mut reg = ClientRegistry::new();
        for w in [1, 2, 3] {
            reg.attach(client(w));
        }
        // order: 3, 2, 1
        assert_eq!(reg.next_matching(1, |_| true), Some(3));
        assert_eq!(reg.prev_matching(3, |_| true), Some(1));
        assert_eq!(reg.next_matching(3, |c| c.window != 2), Some(1));
        assert_eq!(reg.next_matching(3, |c| c.window == 3), None);
    }

    #[test]
    fn test_tiled_subsequence_is_oldest_first() {
        let mut reg = ClientRegistry::new();
        for w in [1, 2, 3] {
            let mut c = client(w);
            c.flags.insert(crate::window::client::ClientFlags::TILED);
            reg.attach(c);
        }
        reg.get_mut(2).unwrap().tag = 1;
        assert_eq!(reg.tiled_on(0, 0), vec![1, 3]);
        assert_eq!(reg.tiled_on(0, 1), vec![2]);
    }

    #[test]
    fn test_swap_positions() {
        let mut reg = ClientRegistry::new();
        for w in [1, 2, 3] {
            reg.attach(client(w));
        }
        assert!(reg.swap(3, 1));
        assert_eq!(reg.windows(), vec![1, 2, 3]);
        assert!(!reg.swap(3, 9));
    }
}
